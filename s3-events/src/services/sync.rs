use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::config::RunContext;
use crate::errors::SyncError;
use crate::manifest::{ServiceManifest, StackOutput};
use crate::models::{BucketPlan, NotificationEntry, PermissionStatement};
use crate::provider::ProviderClient;

use super::extractor::extract_bucket_plans;
use super::identity::resolve_invoke_target;
use super::notifications::NotificationReconciler;
use super::permissions::{PermissionReconciler, PolicyCache};
use super::verifier::verify_buckets_exist;

/// Orchestrates one apply or teardown run. Each bucket converges as an
/// independent unit of work: one unit failing never rolls back or blocks
/// its siblings, and the run reports every failed unit by name.
pub struct EventSyncService {
    provider: Arc<dyn ProviderClient>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub triggers_synced: usize,
    pub buckets_written: usize,
    pub failures: Vec<UnitFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: String,
}

impl EventSyncService {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self { provider }
    }

    /// Attach every declared trigger to its (existing) bucket.
    ///
    /// Bucket existence is verified before any mutation. Identity
    /// resolution and permission convergence fan out per trigger and all
    /// complete before any bucket's notification write, so written entries
    /// only ever reference granted, resolved identities.
    pub async fn apply(
        &self,
        manifest: &ServiceManifest,
        outputs: &[StackOutput],
        ctx: &RunContext,
    ) -> Result<SyncReport, SyncError> {
        let plans = extract_bucket_plans(manifest)?;
        let mut report = SyncReport::default();
        if plans.is_empty() {
            info!("no bucket triggers declared; nothing to do");
            return Ok(report);
        }

        verify_buckets_exist(self.provider.as_ref(), &plans).await?;

        let cache = PolicyCache::new();
        let versioning_disabled = manifest.versioning_disabled();

        let mut tasks = Vec::new();
        for plan in &plans {
            for entry in &plan.entries {
                let deployed_name =
                    manifest.deployed_name(&entry.invoke_target, &ctx.stage);
                let cache = &cache;
                tasks.push(async move {
                    let converged = self
                        .converge_entry(
                            cache,
                            outputs,
                            &plan.bucket,
                            entry,
                            &deployed_name,
                            versioning_disabled,
                        )
                        .await;
                    (plan.bucket.as_str(), deployed_name, converged)
                });
            }
        }

        let mut staged: Vec<BucketPlan> = plans
            .iter()
            .map(|p| BucketPlan {
                bucket: p.bucket.clone(),
                entries: Vec::new(),
            })
            .collect();
        for (bucket, deployed_name, converged) in join_all(tasks).await {
            match converged {
                Ok(resolved) => {
                    if let Some(plan) =
                        staged.iter_mut().find(|p| p.bucket == bucket)
                    {
                        plan.entries.push(resolved);
                    }
                }
                Err(e) => {
                    warn!(
                        function = %deployed_name,
                        bucket,
                        error = %e,
                        "dropping trigger from this run"
                    );
                    report.failures.push(UnitFailure {
                        unit: format!(
                            "function {deployed_name} (bucket {bucket})"
                        ),
                        error: e.to_string(),
                    });
                }
            }
        }

        let reconciler = NotificationReconciler::new(self.provider.as_ref());
        let writes = staged
            .iter()
            .filter(|plan| !plan.entries.is_empty())
            .map(|plan| {
                let reconciler = &reconciler;
                async move {
                    let written = reconciler.apply(plan).await;
                    (plan.bucket.as_str(), plan.entries.len(), written)
                }
            });
        for (bucket, count, written) in join_all(writes).await {
            match written {
                Ok(()) => {
                    report.buckets_written += 1;
                    report.triggers_synced += count;
                }
                Err(e) => report.failures.push(UnitFailure {
                    unit: format!("bucket {bucket}"),
                    error: e.to_string(),
                }),
            }
        }

        info!(
            triggers = report.triggers_synced,
            buckets = report.buckets_written,
            failed = report.failures.len(),
            "apply complete"
        );
        Ok(report)
    }

    async fn converge_entry(
        &self,
        cache: &PolicyCache,
        outputs: &[StackOutput],
        bucket: &str,
        entry: &NotificationEntry,
        deployed_name: &str,
        versioning_disabled: bool,
    ) -> Result<NotificationEntry, SyncError> {
        let target = resolve_invoke_target(
            self.provider.as_ref(),
            outputs,
            deployed_name,
            versioning_disabled,
        )
        .await?;
        let statement =
            PermissionStatement::invoke_from_bucket(deployed_name, bucket);
        PermissionReconciler::new(self.provider.as_ref(), cache)
            .ensure(&statement)
            .await?;
        Ok(NotificationEntry {
            invoke_target: target,
            ..entry.clone()
        })
    }

    /// Remove every tracked trigger. Identity resolution and permission
    /// statements are left alone: removing a trigger does not need to
    /// touch the invocation permission.
    pub async fn teardown(
        &self,
        manifest: &ServiceManifest,
    ) -> Result<SyncReport, SyncError> {
        let plans = extract_bucket_plans(manifest)?;
        let mut report = SyncReport::default();
        if plans.is_empty() {
            info!("no bucket triggers declared; nothing to remove");
            return Ok(report);
        }

        let reconciler = NotificationReconciler::new(self.provider.as_ref());
        let tasks = plans.iter().map(|plan| {
            let reconciler = &reconciler;
            async move { (plan.bucket.as_str(), reconciler.teardown(plan).await) }
        });
        for (bucket, removed) in join_all(tasks).await {
            match removed {
                Ok(0) => {}
                Ok(n) => {
                    report.buckets_written += 1;
                    report.triggers_synced += n;
                }
                Err(e) => report.failures.push(UnitFailure {
                    unit: format!("bucket {bucket}"),
                    error: e.to_string(),
                }),
            }
        }

        info!(
            triggers = report.triggers_synced,
            buckets = report.buckets_written,
            failed = report.failures.len(),
            "teardown complete"
        );
        Ok(report)
    }
}
