use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("missing the following buckets: {}", .0.join(", "))]
    MissingBuckets(Vec<String>),

    #[error("remote state error: {0}")]
    RemoteState(String),

    #[error("unable to resolve the invocation target of function {function}")]
    UnresolvedIdentity { function: String },

    #[error("provider request failed: {0}")]
    Provider(#[from] ProviderError),
}
