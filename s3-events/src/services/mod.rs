mod extractor;
mod identity;
mod notifications;
mod permissions;
mod sync;
mod verifier;

pub use extractor::extract_bucket_plans;
pub use identity::{resolve_from_outputs, resolve_invoke_target};
pub use notifications::NotificationReconciler;
pub use permissions::{PermissionReconciler, PolicyCache};
pub use sync::{EventSyncService, SyncReport, UnitFailure};
pub use verifier::verify_buckets_exist;
