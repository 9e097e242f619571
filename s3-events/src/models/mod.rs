use serde::Deserialize;

/// Principal the storage service uses when invoking a function.
pub const STORAGE_SERVICE_PRINCIPAL: &str = "s3.amazonaws.com";
pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

/// Event types attached when a trigger declares none.
pub const DEFAULT_BUCKET_EVENTS: &[&str] = &["s3:ObjectCreated:*"];

/// Strip the characters that are not allowed inside derived identifiers.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | ':' | '*'))
        .collect()
}

/// Deterministic notification-entry id for one (function, event list) pair.
/// Recomputing the same id across runs is what makes apply idempotent.
pub fn trigger_id(function_name: &str, events: &[String]) -> String {
    format!(
        "trigger-{}-when-{}",
        function_name,
        sanitize_identifier(&events.join(","))
    )
}

/// Deterministic statement id for one (function, bucket) pair, reused
/// across runs so the statement can be located and replaced.
pub fn statement_id(deployed_name: &str, bucket: &str) -> String {
    format!("{}-{}", deployed_name, sanitize_identifier(bucket))
}

pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// Drop a trailing `:<digits>` version qualifier from an ARN, if any.
pub fn strip_version_qualifier(arn: &str) -> &str {
    match arn.rfind(':') {
        Some(idx)
            if idx + 1 < arn.len()
                && arn[idx + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &arn[..idx]
        }
        _ => arn,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFilter {
    pub rules: Vec<FilterRule>,
}

/// One desired bucket-side trigger record. `invoke_target` starts out as
/// the logical function name and is replaced by the resolved invocation
/// ARN before any remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEntry {
    pub id: String,
    pub invoke_target: String,
    pub events: Vec<String>,
    pub filter: Option<KeyFilter>,
}

impl NotificationEntry {
    /// A remote rule is the same logical entry when either its target or
    /// its id matches.
    pub fn matches(&self, rule: &NotificationRule) -> bool {
        rule.target == self.invoke_target
            || rule.id.as_deref() == Some(self.id.as_str())
    }

    pub fn into_rule(self) -> NotificationRule {
        NotificationRule {
            id: Some(self.id),
            target: self.invoke_target,
            events: self.events,
            filter: self.filter,
        }
    }
}

/// Desired triggers for one bucket. Entries keep manifest order and carry
/// unique ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPlan {
    pub bucket: String,
    pub entries: Vec<NotificationEntry>,
}

/// One remote notification rule, for any target kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRule {
    pub id: Option<String>,
    pub target: String,
    pub events: Vec<String>,
    pub filter: Option<KeyFilter>,
}

/// A bucket's full remote notification state. Only `functions` is ever
/// reconciled; `topics`, `queues` and the event-bus flag are read and
/// written back untouched because the provider only offers a full-replace
/// write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteNotificationConfig {
    pub functions: Vec<NotificationRule>,
    pub topics: Vec<NotificationRule>,
    pub queues: Vec<NotificationRule>,
    pub event_bridge: bool,
}

/// The function-side record granting the storage service the right to
/// invoke, scoped to one source bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatement {
    pub function_name: String,
    pub statement_id: String,
    pub action: String,
    pub principal: String,
    pub source_arn: String,
}

impl PermissionStatement {
    pub fn invoke_from_bucket(deployed_name: &str, bucket: &str) -> Self {
        Self {
            function_name: deployed_name.to_string(),
            statement_id: statement_id(deployed_name, bucket),
            action: INVOKE_ACTION.to_string(),
            principal: STORAGE_SERVICE_PRINCIPAL.to_string(),
            source_arn: bucket_arn(bucket),
        }
    }
}

/// Parsed function resource policy. Only statement ids are inspected.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    pub statements: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Sid", default)]
    pub sid: Option<String>,
}

impl PolicyDocument {
    pub fn has_statement(&self, sid: &str) -> bool {
        self.statements
            .iter()
            .any(|s| s.sid.as_deref() == Some(sid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_identifier("s3:ObjectCreated:*"), "s3ObjectCreated");
        assert_eq!(sanitize_identifier("my.bucket.name"), "mybucketname");
        assert_eq!(sanitize_identifier("plain-name"), "plain-name");
        assert_eq!(sanitize_identifier(""), "");
    }

    #[test]
    fn trigger_id_joins_and_sanitizes_events() {
        let events = vec!["object-created:*".to_string()];
        assert_eq!(trigger_id("f1", &events), "trigger-f1-when-object-created");

        let events = vec![
            "s3:ObjectCreated:*".to_string(),
            "s3:ObjectRemoved:*".to_string(),
        ];
        assert_eq!(
            trigger_id("thumbs", &events),
            "trigger-thumbs-when-s3ObjectCreated,s3ObjectRemoved"
        );
    }

    #[test]
    fn trigger_id_with_empty_event_list() {
        assert_eq!(trigger_id("f1", &[]), "trigger-f1-when-");
    }

    #[test]
    fn statement_id_sanitizes_bucket_name() {
        assert_eq!(statement_id("f1", "b1"), "f1-b1");
        assert_eq!(
            statement_id("svc-dev-f1", "my.logs.bucket"),
            "svc-dev-f1-mylogsbucket"
        );
    }

    #[test]
    fn strip_version_qualifier_cases() {
        assert_eq!(
            strip_version_qualifier("arn:aws:lambda:us-east-1:1:function:f1:12"),
            "arn:aws:lambda:us-east-1:1:function:f1"
        );
        assert_eq!(
            strip_version_qualifier("arn:aws:lambda:us-east-1:1:function:f1"),
            "arn:aws:lambda:us-east-1:1:function:f1"
        );
        // trailing colon is not a qualifier
        assert_eq!(strip_version_qualifier("f1:"), "f1:");
        assert_eq!(strip_version_qualifier("f1"), "f1");
    }

    #[test]
    fn policy_document_parses_statement_ids() {
        let raw = r#"{
            "Version": "2012-10-17",
            "Statement": [
                {"Sid": "f1-b1", "Effect": "Allow"},
                {"Effect": "Allow"}
            ]
        }"#;
        let doc: PolicyDocument = serde_json::from_str(raw).unwrap();
        assert!(doc.has_statement("f1-b1"));
        assert!(!doc.has_statement("f1-b2"));
    }
}
