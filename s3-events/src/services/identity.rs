use tracing::debug;

use crate::errors::SyncError;
use crate::manifest::StackOutput;
use crate::models::strip_version_qualifier;
use crate::provider::ProviderClient;

/// Search the gathered stack outputs for the deployed function's
/// invocation ARN, dropping any trailing version qualifier.
pub fn resolve_from_outputs(
    outputs: &[StackOutput],
    deployed_name: &str,
) -> Option<String> {
    outputs
        .iter()
        .find(|o| o.output_value.contains(deployed_name))
        .map(|o| strip_version_qualifier(&o.output_value).to_string())
}

/// Map a deployed function name to its concrete invocation target.
///
/// The stack outputs are the primary source. When they carry nothing for
/// this function and the manifest explicitly disabled versioning (so the
/// stack exports no version ARN), fall back to a direct lookup. Failing
/// both is fatal for this function's trigger only.
pub async fn resolve_invoke_target(
    provider: &dyn ProviderClient,
    outputs: &[StackOutput],
    deployed_name: &str,
    versioning_disabled: bool,
) -> Result<String, SyncError> {
    if let Some(target) = resolve_from_outputs(outputs, deployed_name) {
        debug!(
            function = deployed_name,
            %target,
            "resolved invocation target from stack outputs"
        );
        return Ok(target);
    }

    if versioning_disabled {
        let target = provider.get_function_arn(deployed_name).await?;
        debug!(
            function = deployed_name,
            %target,
            "resolved invocation target by direct lookup"
        );
        return Ok(target);
    }

    Err(SyncError::UnresolvedIdentity {
        function: deployed_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(key: &str, value: &str) -> StackOutput {
        StackOutput {
            output_key: key.to_string(),
            output_value: value.to_string(),
        }
    }

    #[test]
    fn finds_matching_output_and_strips_qualifier() {
        let outputs = vec![
            output("ServiceEndpoint", "https://x.example.com"),
            output(
                "F1QualifiedArn",
                "arn:aws:lambda:us-east-1:1:function:svc-dev-f1:7",
            ),
        ];
        assert_eq!(
            resolve_from_outputs(&outputs, "svc-dev-f1").as_deref(),
            Some("arn:aws:lambda:us-east-1:1:function:svc-dev-f1")
        );
    }

    #[test]
    fn unqualified_output_passes_through() {
        let outputs = vec![output(
            "F1Arn",
            "arn:aws:lambda:us-east-1:1:function:svc-dev-f1",
        )];
        assert_eq!(
            resolve_from_outputs(&outputs, "svc-dev-f1").as_deref(),
            Some("arn:aws:lambda:us-east-1:1:function:svc-dev-f1")
        );
    }

    #[test]
    fn unrelated_outputs_do_not_match() {
        let outputs = vec![output("OtherArn", "arn:aws:lambda:::function:g2:3")];
        assert_eq!(resolve_from_outputs(&outputs, "svc-dev-f1"), None);
    }
}
