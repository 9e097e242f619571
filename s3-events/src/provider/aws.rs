use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::types as s3_types;
use tracing::debug;

use super::{ProviderClient, ProviderError};
use crate::manifest::StackOutput;
use crate::models::{
    FilterRule, KeyFilter, NotificationRule, PermissionStatement,
    RemoteNotificationConfig,
};
use async_trait::async_trait;

/// AWS-backed transport over the storage and function services, plus the
/// deployment-stack output lookup used by identity resolution.
pub struct AwsProviderClient {
    s3: aws_sdk_s3::Client,
    lambda: aws_sdk_lambda::Client,
    cloudformation: aws_sdk_cloudformation::Client,
}

impl AwsProviderClient {
    pub async fn connect(region: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            s3: aws_sdk_s3::Client::new(&shared),
            lambda: aws_sdk_lambda::Client::new(&shared),
            cloudformation: aws_sdk_cloudformation::Client::new(&shared),
        }
    }

    /// Outputs of the deployment stack backing this service. Failing to
    /// describe the stack usually means the service was never deployed.
    pub async fn fetch_stack_outputs(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackOutput>, ProviderError> {
        let output = self
            .cloudformation
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| {
                ProviderError::other(format!(
                    "cannot describe stack {stack_name} (has the service \
                     been deployed?): {:?}",
                    e.into_service_error()
                ))
            })?;
        let stack = output
            .stacks
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                ProviderError::not_found(format!("stack {stack_name} not found"))
            })?;
        Ok(stack
            .outputs
            .unwrap_or_default()
            .into_iter()
            .filter_map(|o| match (o.output_key, o.output_value) {
                (Some(output_key), Some(output_value)) => Some(StackOutput {
                    output_key,
                    output_value,
                }),
                _ => None,
            })
            .collect())
    }
}

fn filter_from_sdk(
    filter: Option<s3_types::NotificationConfigurationFilter>,
) -> Option<KeyFilter> {
    let rules: Vec<FilterRule> = filter?
        .key?
        .filter_rules
        .unwrap_or_default()
        .into_iter()
        .map(|r| FilterRule {
            name: r.name.map(|n| n.as_str().to_string()).unwrap_or_default(),
            value: r.value.unwrap_or_default(),
        })
        .collect();
    if rules.is_empty() { None } else { Some(KeyFilter { rules }) }
}

fn filter_to_sdk(filter: &KeyFilter) -> s3_types::NotificationConfigurationFilter {
    let rules = filter
        .rules
        .iter()
        .map(|r| {
            s3_types::FilterRule::builder()
                .name(s3_types::FilterRuleName::from(r.name.as_str()))
                .value(r.value.clone())
                .build()
        })
        .collect();
    s3_types::NotificationConfigurationFilter::builder()
        .key(
            s3_types::S3KeyFilter::builder()
                .set_filter_rules(Some(rules))
                .build(),
        )
        .build()
}

fn events_from_sdk(events: Vec<s3_types::Event>) -> Vec<String> {
    events.into_iter().map(|e| e.as_str().to_string()).collect()
}

fn events_to_sdk(events: &[String]) -> Vec<s3_types::Event> {
    events
        .iter()
        .map(|e| s3_types::Event::from(e.as_str()))
        .collect()
}

fn function_rule_from_sdk(
    cfg: s3_types::LambdaFunctionConfiguration,
) -> NotificationRule {
    NotificationRule {
        id: cfg.id,
        target: cfg.lambda_function_arn,
        events: events_from_sdk(cfg.events),
        filter: filter_from_sdk(cfg.filter),
    }
}

fn function_rule_to_sdk(
    rule: &NotificationRule,
) -> Result<s3_types::LambdaFunctionConfiguration, ProviderError> {
    let mut builder = s3_types::LambdaFunctionConfiguration::builder()
        .set_id(rule.id.clone())
        .lambda_function_arn(rule.target.clone())
        .set_events(Some(events_to_sdk(&rule.events)));
    if let Some(filter) = &rule.filter {
        builder = builder.filter(filter_to_sdk(filter));
    }
    builder
        .build()
        .map_err(|e| ProviderError::other(format!("invalid function rule: {e}")))
}

fn topic_rule_from_sdk(cfg: s3_types::TopicConfiguration) -> NotificationRule {
    NotificationRule {
        id: cfg.id,
        target: cfg.topic_arn,
        events: events_from_sdk(cfg.events),
        filter: filter_from_sdk(cfg.filter),
    }
}

fn topic_rule_to_sdk(
    rule: &NotificationRule,
) -> Result<s3_types::TopicConfiguration, ProviderError> {
    let mut builder = s3_types::TopicConfiguration::builder()
        .set_id(rule.id.clone())
        .topic_arn(rule.target.clone())
        .set_events(Some(events_to_sdk(&rule.events)));
    if let Some(filter) = &rule.filter {
        builder = builder.filter(filter_to_sdk(filter));
    }
    builder
        .build()
        .map_err(|e| ProviderError::other(format!("invalid topic rule: {e}")))
}

fn queue_rule_from_sdk(cfg: s3_types::QueueConfiguration) -> NotificationRule {
    NotificationRule {
        id: cfg.id,
        target: cfg.queue_arn,
        events: events_from_sdk(cfg.events),
        filter: filter_from_sdk(cfg.filter),
    }
}

fn queue_rule_to_sdk(
    rule: &NotificationRule,
) -> Result<s3_types::QueueConfiguration, ProviderError> {
    let mut builder = s3_types::QueueConfiguration::builder()
        .set_id(rule.id.clone())
        .queue_arn(rule.target.clone())
        .set_events(Some(events_to_sdk(&rule.events)));
    if let Some(filter) = &rule.filter {
        builder = builder.filter(filter_to_sdk(filter));
    }
    builder
        .build()
        .map_err(|e| ProviderError::other(format!("invalid queue rule: {e}")))
}

#[async_trait]
impl ProviderClient for AwsProviderClient {
    async fn list_buckets(&self) -> Result<Option<Vec<String>>, ProviderError> {
        let output = self.s3.list_buckets().send().await.map_err(|e| {
            ProviderError::other(format!(
                "bucket listing failed: {:?}",
                e.into_service_error()
            ))
        })?;
        Ok(output.buckets.map(|buckets| {
            buckets.into_iter().filter_map(|b| b.name).collect()
        }))
    }

    async fn get_bucket_notifications(
        &self,
        bucket: &str,
    ) -> Result<RemoteNotificationConfig, ProviderError> {
        let output = self
            .s3
            .get_bucket_notification_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                ProviderError::other(format!(
                    "cannot read notification configuration of {bucket}: {:?}",
                    e.into_service_error()
                ))
            })?;
        debug!(bucket, "fetched bucket notification configuration");
        Ok(RemoteNotificationConfig {
            functions: output
                .lambda_function_configurations
                .unwrap_or_default()
                .into_iter()
                .map(function_rule_from_sdk)
                .collect(),
            topics: output
                .topic_configurations
                .unwrap_or_default()
                .into_iter()
                .map(topic_rule_from_sdk)
                .collect(),
            queues: output
                .queue_configurations
                .unwrap_or_default()
                .into_iter()
                .map(queue_rule_from_sdk)
                .collect(),
            event_bridge: output.event_bridge_configuration.is_some(),
        })
    }

    async fn put_bucket_notifications(
        &self,
        bucket: &str,
        config: RemoteNotificationConfig,
    ) -> Result<(), ProviderError> {
        let functions = config
            .functions
            .iter()
            .map(function_rule_to_sdk)
            .collect::<Result<Vec<_>, _>>()?;
        let topics = config
            .topics
            .iter()
            .map(topic_rule_to_sdk)
            .collect::<Result<Vec<_>, _>>()?;
        let queues = config
            .queues
            .iter()
            .map(queue_rule_to_sdk)
            .collect::<Result<Vec<_>, _>>()?;
        let notification_configuration =
            s3_types::NotificationConfiguration::builder()
                .set_lambda_function_configurations(Some(functions))
                .set_topic_configurations(Some(topics))
                .set_queue_configurations(Some(queues))
                .set_event_bridge_configuration(config.event_bridge.then(
                    || s3_types::EventBridgeConfiguration::builder().build(),
                ))
                .build();
        self.s3
            .put_bucket_notification_configuration()
            .bucket(bucket)
            .notification_configuration(notification_configuration)
            .send()
            .await
            .map_err(|e| {
                ProviderError::other(format!(
                    "cannot write notification configuration of {bucket}: {:?}",
                    e.into_service_error()
                ))
            })?;
        debug!(bucket, "replaced bucket notification configuration");
        Ok(())
    }

    async fn get_function_arn(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError> {
        match self
            .lambda
            .get_function()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => output
                .configuration
                .and_then(|c| c.function_arn)
                .ok_or_else(|| {
                    ProviderError::other(format!(
                        "no ARN returned for function {function_name}"
                    ))
                }),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(ProviderError::not_found(format!(
                        "function {function_name} not found"
                    )))
                } else {
                    Err(ProviderError::other(format!("{service_error:?}")))
                }
            }
        }
    }

    async fn get_function_policy(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError> {
        match self
            .lambda
            .get_policy()
            .function_name(function_name)
            .send()
            .await
        {
            Ok(output) => output.policy.ok_or_else(|| {
                ProviderError::not_found(format!(
                    "function {function_name} has no policy document"
                ))
            }),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(ProviderError::not_found(format!(
                        "function {function_name} has no policy"
                    )))
                } else {
                    Err(ProviderError::other(format!("{service_error:?}")))
                }
            }
        }
    }

    async fn add_permission(
        &self,
        statement: &PermissionStatement,
    ) -> Result<(), ProviderError> {
        self.lambda
            .add_permission()
            .function_name(statement.function_name.clone())
            .statement_id(statement.statement_id.clone())
            .action(statement.action.clone())
            .principal(statement.principal.clone())
            .source_arn(statement.source_arn.clone())
            .send()
            .await
            .map_err(|e| {
                ProviderError::other(format!(
                    "cannot add permission {} to {}: {:?}",
                    statement.statement_id,
                    statement.function_name,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }

    async fn remove_permission(
        &self,
        function_name: &str,
        statement_id: &str,
    ) -> Result<(), ProviderError> {
        match self
            .lambda
            .remove_permission()
            .function_name(function_name)
            .statement_id(statement_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    Err(ProviderError::not_found(format!(
                        "statement {statement_id} not present on \
                         {function_name}"
                    )))
                } else {
                    Err(ProviderError::other(format!("{service_error:?}")))
                }
            }
        }
    }
}
