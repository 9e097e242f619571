use tracing::{debug, info};

use crate::errors::SyncError;
use crate::models::BucketPlan;
use crate::provider::ProviderClient;

/// Read-modify-write reconciliation of one bucket's notification
/// configuration.
///
/// The write replaces the bucket's full configuration; nothing guards the
/// read-to-write window against concurrent writers, so an external
/// modification racing a run can be lost. Accepted limitation.
pub struct NotificationReconciler<'a> {
    provider: &'a dyn ProviderClient,
}

impl<'a> NotificationReconciler<'a> {
    pub fn new(provider: &'a dyn ProviderClient) -> Self {
        Self { provider }
    }

    /// Merge the plan's entries into the remote configuration: an existing
    /// rule with matching identity is removed first, the desired entry
    /// appended. Rules owned by other systems survive untouched.
    pub async fn apply(&self, plan: &BucketPlan) -> Result<(), SyncError> {
        let mut remote =
            self.provider.get_bucket_notifications(&plan.bucket).await?;

        for entry in &plan.entries {
            if let Some(idx) =
                remote.functions.iter().position(|rule| entry.matches(rule))
            {
                remote.functions.remove(idx);
            }
            info!(
                bucket = %plan.bucket,
                target = %entry.invoke_target,
                events = ?entry.events,
                "attaching trigger"
            );
            remote.functions.push(entry.clone().into_rule());
        }

        self.provider
            .put_bucket_notifications(&plan.bucket, remote)
            .await?;
        Ok(())
    }

    /// Remove every rule the plan recognizes. Returns how many were
    /// removed; a bucket with nothing to remove receives no write at all.
    pub async fn teardown(&self, plan: &BucketPlan) -> Result<usize, SyncError> {
        let mut remote =
            self.provider.get_bucket_notifications(&plan.bucket).await?;

        let mut removed = 0;
        for entry in &plan.entries {
            if let Some(idx) =
                remote.functions.iter().position(|rule| entry.matches(rule))
            {
                info!(
                    bucket = %plan.bucket,
                    target = %entry.invoke_target,
                    events = ?entry.events,
                    "removing trigger"
                );
                remote.functions.remove(idx);
                removed += 1;
            }
        }

        if removed == 0 {
            debug!(
                bucket = %plan.bucket,
                "no tracked triggers present; skipping write"
            );
            return Ok(0);
        }

        self.provider
            .put_bucket_notifications(&plan.bucket, remote)
            .await?;
        Ok(removed)
    }
}
