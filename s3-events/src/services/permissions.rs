use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::errors::SyncError;
use crate::models::{PermissionStatement, PolicyDocument};
use crate::provider::ProviderClient;

/// Per-run memoization of function policy documents.
///
/// Several triggers commonly target the same function; the first reader's
/// in-flight fetch is shared with every concurrent reader for that
/// function, so one run issues at most one policy read per function.
/// Scoped to a single orchestrator run, constructed fresh each time.
#[derive(Default)]
pub struct PolicyCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Option<PolicyDocument>>>>>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        provider: &dyn ProviderClient,
        function_name: &str,
    ) -> Result<Option<PolicyDocument>, SyncError> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells
                .entry(function_name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(|| fetch_policy(provider, function_name))
            .await
            .map(|policy| policy.clone())
    }
}

async fn fetch_policy(
    provider: &dyn ProviderClient,
    function_name: &str,
) -> Result<Option<PolicyDocument>, SyncError> {
    match provider.get_function_policy(function_name).await {
        Ok(raw) => {
            let document = serde_json::from_str(&raw).map_err(|e| {
                SyncError::RemoteState(format!(
                    "unparseable policy document for {function_name}: {e}"
                ))
            })?;
            Ok(Some(document))
        }
        // a function without any policy yet reads as empty, not as failure
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Converges the invocation-permission statement for one (function, bucket)
/// pair: the statement exists exactly once afterwards.
pub struct PermissionReconciler<'a> {
    provider: &'a dyn ProviderClient,
    cache: &'a PolicyCache,
}

impl<'a> PermissionReconciler<'a> {
    pub fn new(
        provider: &'a dyn ProviderClient,
        cache: &'a PolicyCache,
    ) -> Self {
        Self { provider, cache }
    }

    /// The provider has no atomic upsert for policy statements, so a stale
    /// statement with our id is deleted first and the desired one added
    /// under the same deterministic id. A statement that vanished between
    /// the read and the delete already is the desired end state.
    pub async fn ensure(
        &self,
        statement: &PermissionStatement,
    ) -> Result<(), SyncError> {
        let policy = self
            .cache
            .get(self.provider, &statement.function_name)
            .await?;
        let stale = policy
            .as_ref()
            .is_some_and(|p| p.has_statement(&statement.statement_id));

        if stale {
            debug!(
                function = %statement.function_name,
                sid = %statement.statement_id,
                "replacing existing invocation permission"
            );
            match self
                .provider
                .remove_permission(
                    &statement.function_name,
                    &statement.statement_id,
                )
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.provider.add_permission(statement).await?;
        Ok(())
    }
}
