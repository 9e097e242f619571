use std::collections::HashSet;

use tracing::info;

use crate::errors::SyncError;
use crate::models::BucketPlan;
use crate::provider::ProviderClient;

/// Confirm every planned bucket exists remotely before any mutation.
///
/// One listing call for the whole run; every missing bucket is reported in
/// a single batched error. Skips the remote call entirely when there is
/// nothing to verify.
pub async fn verify_buckets_exist(
    provider: &dyn ProviderClient,
    plans: &[BucketPlan],
) -> Result<(), SyncError> {
    if plans.is_empty() {
        return Ok(());
    }

    info!("checking that target buckets exist");
    let existing: HashSet<String> = provider
        .list_buckets()
        .await?
        .ok_or_else(|| {
            SyncError::RemoteState("bucket listing returned no result".into())
        })?
        .into_iter()
        .collect();

    let missing: Vec<String> = plans
        .iter()
        .filter(|p| !existing.contains(&p.bucket))
        .map(|p| p.bucket.clone())
        .collect();

    if missing.is_empty() {
        info!("all target buckets exist");
        Ok(())
    } else {
        Err(SyncError::MissingBuckets(missing))
    }
}
