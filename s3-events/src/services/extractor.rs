use tracing::debug;

use crate::errors::SyncError;
use crate::manifest::ServiceManifest;
use crate::models::{
    BucketPlan, FilterRule, KeyFilter, NotificationEntry, trigger_id,
};

/// Derive the desired per-bucket trigger plans from the function registry.
///
/// Pure: no remote calls, deterministic for a given manifest. Functions
/// iterate in sorted-key order; triggers for the same bucket merge into one
/// plan, appending in declaration order. Each entry's `invoke_target` is
/// the logical function name, a placeholder resolved later.
pub fn extract_bucket_plans(
    manifest: &ServiceManifest,
) -> Result<Vec<BucketPlan>, SyncError> {
    let mut plans: Vec<BucketPlan> = Vec::new();

    for (logical_name, function) in &manifest.functions {
        for event in &function.events {
            let Some(spec) = event.existing_s3.as_ref() else {
                continue;
            };
            let bucket = spec
                .bucket
                .as_deref()
                .filter(|b| !b.is_empty())
                .ok_or_else(|| {
                    SyncError::Configuration(format!(
                        "function {logical_name} declares a bucket trigger \
                         without a bucket name"
                    ))
                })?;

            let events = spec.event_types();
            let rules = spec.filter_rules();
            // zero declared rules means no filter object at all
            let filter = if rules.is_empty() {
                None
            } else {
                Some(KeyFilter {
                    rules: rules
                        .into_iter()
                        .map(|(name, value)| FilterRule { name, value })
                        .collect(),
                })
            };

            let entry = NotificationEntry {
                id: trigger_id(logical_name, &events),
                invoke_target: logical_name.clone(),
                events,
                filter,
            };

            let idx = match plans.iter().position(|p| p.bucket == bucket) {
                Some(idx) => idx,
                None => {
                    plans.push(BucketPlan {
                        bucket: bucket.to_string(),
                        entries: Vec::new(),
                    });
                    plans.len() - 1
                }
            };
            let plan = &mut plans[idx];
            if plan.entries.iter().any(|e| e.id == entry.id) {
                return Err(SyncError::Configuration(format!(
                    "duplicate trigger id {} for bucket {}",
                    entry.id, plan.bucket
                )));
            }
            plan.entries.push(entry);
        }
    }

    debug!(buckets = plans.len(), "extracted bucket plans from manifest");
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> ServiceManifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_entry_with_defaults() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [{"existingS3": {"bucket": "b1"}}]}
            }
        }));
        let plans = extract_bucket_plans(&m).unwrap();
        assert_eq!(plans.len(), 1);
        let entry = &plans[0].entries[0];
        assert_eq!(entry.id, "trigger-f1-when-s3ObjectCreated");
        assert_eq!(entry.invoke_target, "f1");
        assert_eq!(entry.events, vec!["s3:ObjectCreated:*".to_string()]);
        assert!(entry.filter.is_none());
    }

    #[test]
    fn builds_filter_only_when_rules_declared() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [{"existingS3": {
                    "bucket": "b1",
                    "rules": [{"prefix": "in/"}, {"suffix": ".csv"}]
                }}]},
                "f2": {"events": [{"existingS3": {
                    "bucket": "b1",
                    "rules": []
                }}]}
            }
        }));
        let plans = extract_bucket_plans(&m).unwrap();
        let filter = plans[0].entries[0].filter.as_ref().unwrap();
        assert_eq!(filter.rules.len(), 2);
        assert_eq!(filter.rules[0].name, "prefix");
        assert_eq!(filter.rules[0].value, "in/");
        assert!(plans[0].entries[1].filter.is_none());
    }

    #[test]
    fn merges_triggers_for_the_same_bucket() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [{"existingS3": {"bucket": "b1"}}]},
                "f2": {"events": [{"existingS3": {"bucket": "b1"}}]},
                "f3": {"events": [{"existingS3": {"bucket": "b2"}}]}
            }
        }));
        let plans = extract_bucket_plans(&m).unwrap();
        assert_eq!(plans.len(), 2);
        let b1 = plans.iter().find(|p| p.bucket == "b1").unwrap();
        assert_eq!(b1.entries.len(), 2);
        assert_ne!(b1.entries[0].id, b1.entries[1].id);
    }

    #[test]
    fn missing_bucket_name_is_a_configuration_error() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [{"existingS3": {"events": ["s3:ObjectCreated:*"]}}]}
            }
        }));
        let err = extract_bucket_plans(&m).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(err.to_string().contains("f1"));
    }

    #[test]
    fn duplicate_entry_id_is_a_configuration_error() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [
                    {"existingS3": {"bucket": "b1"}},
                    {"existingS3": {"bucket": "b1"}}
                ]}
            }
        }));
        let err = extract_bucket_plans(&m).unwrap_err();
        assert!(err.to_string().contains("duplicate trigger id"));
    }

    #[test]
    fn non_storage_events_are_ignored() {
        let m = manifest(json!({
            "service": "svc",
            "functions": {
                "f1": {"events": [{"schedule": "rate(5 minutes)"}]}
            }
        }));
        assert!(extract_bucket_plans(&m).unwrap().is_empty());
    }
}
