#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use s3_events::models::{PermissionStatement, RemoteNotificationConfig};
use s3_events::provider::{ProviderClient, ProviderError};
use serde_json::json;

/// In-memory provider double recording every remote interaction.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub buckets: Vec<String>,
    pub notifications: HashMap<String, RemoteNotificationConfig>,
    /// function -> statement ids currently present in its policy
    pub policy_sids: HashMap<String, Vec<String>>,
    pub function_arns: HashMap<String, String>,

    pub list_calls: usize,
    pub get_policy_calls: HashMap<String, usize>,
    pub put_calls: HashMap<String, usize>,
    pub added_permissions: Vec<PermissionStatement>,
    pub removed_permissions: Vec<(String, String)>,

    pub list_returns_none: bool,
    pub fail_remove_with_not_found: bool,
}

impl FakeProvider {
    pub fn with_buckets(buckets: &[&str]) -> Self {
        let provider = Self::default();
        provider.state().buckets =
            buckets.iter().map(|b| b.to_string()).collect();
        provider
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn list_buckets(&self) -> Result<Option<Vec<String>>, ProviderError> {
        let mut state = self.state();
        state.list_calls += 1;
        if state.list_returns_none {
            return Ok(None);
        }
        Ok(Some(state.buckets.clone()))
    }

    async fn get_bucket_notifications(
        &self,
        bucket: &str,
    ) -> Result<RemoteNotificationConfig, ProviderError> {
        Ok(self
            .state()
            .notifications
            .get(bucket)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_bucket_notifications(
        &self,
        bucket: &str,
        config: RemoteNotificationConfig,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        *state.put_calls.entry(bucket.to_string()).or_default() += 1;
        state.notifications.insert(bucket.to_string(), config);
        Ok(())
    }

    async fn get_function_arn(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError> {
        self.state()
            .function_arns
            .get(function_name)
            .cloned()
            .ok_or_else(|| {
                ProviderError::not_found(format!(
                    "function {function_name} not found"
                ))
            })
    }

    async fn get_function_policy(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError> {
        let mut state = self.state();
        *state
            .get_policy_calls
            .entry(function_name.to_string())
            .or_default() += 1;
        match state.policy_sids.get(function_name) {
            None => Err(ProviderError::not_found(format!(
                "function {function_name} has no policy"
            ))),
            Some(sids) => Ok(json!({
                "Version": "2012-10-17",
                "Statement": sids
                    .iter()
                    .map(|sid| json!({"Sid": sid, "Effect": "Allow"}))
                    .collect::<Vec<_>>(),
            })
            .to_string()),
        }
    }

    async fn add_permission(
        &self,
        statement: &PermissionStatement,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.added_permissions.push(statement.clone());
        state
            .policy_sids
            .entry(statement.function_name.clone())
            .or_default()
            .push(statement.statement_id.clone());
        Ok(())
    }

    async fn remove_permission(
        &self,
        function_name: &str,
        statement_id: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        state
            .removed_permissions
            .push((function_name.to_string(), statement_id.to_string()));
        if state.fail_remove_with_not_found {
            return Err(ProviderError::not_found(format!(
                "statement {statement_id} not present on {function_name}"
            )));
        }
        let Some(sids) = state.policy_sids.get_mut(function_name) else {
            return Err(ProviderError::not_found(format!(
                "function {function_name} has no policy"
            )));
        };
        match sids.iter().position(|sid| sid == statement_id) {
            Some(idx) => {
                sids.remove(idx);
                Ok(())
            }
            None => Err(ProviderError::not_found(format!(
                "statement {statement_id} not present on {function_name}"
            ))),
        }
    }
}
