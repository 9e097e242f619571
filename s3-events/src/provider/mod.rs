//! The transport seam to the cloud provider.
//!
//! Core services depend only on [`ProviderClient`]; the AWS-backed
//! implementation lives in [`aws`]. Failures carry one structured
//! classification, [`ProviderErrorKind`], and the reconcilers key every
//! "already absent" decision on [`ProviderError::is_not_found`] rather
//! than on messages or status codes.

pub mod aws;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PermissionStatement, RemoteNotificationConfig};

pub use aws::AwsProviderClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The remote entity does not exist. Semantically equivalent to empty
    /// state for reads, and to success for deletes.
    NotFound,
    Other,
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    message: String,
}

impl ProviderError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }
}

/// Remote operations this system performs, parameterized by the run's
/// execution context at construction time.
///
/// `get_bucket_notifications` / `put_bucket_notifications` form an
/// explicit read-modify-write pair: the provider has no partial update or
/// optimistic concurrency primitive, so a concurrent writer between the
/// read and the write is a documented lost-update risk.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// All remote bucket names, or `None` when the listing call returned
    /// no usable result.
    async fn list_buckets(&self) -> Result<Option<Vec<String>>, ProviderError>;

    async fn get_bucket_notifications(
        &self,
        bucket: &str,
    ) -> Result<RemoteNotificationConfig, ProviderError>;

    async fn put_bucket_notifications(
        &self,
        bucket: &str,
        config: RemoteNotificationConfig,
    ) -> Result<(), ProviderError>;

    /// Current unqualified invocation ARN of a deployed function.
    async fn get_function_arn(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError>;

    /// The function's resource policy document, as raw JSON. A function
    /// without a policy yields `NotFound`.
    async fn get_function_policy(
        &self,
        function_name: &str,
    ) -> Result<String, ProviderError>;

    async fn add_permission(
        &self,
        statement: &PermissionStatement,
    ) -> Result<(), ProviderError>;

    async fn remove_permission(
        &self,
        function_name: &str,
        statement_id: &str,
    ) -> Result<(), ProviderError>;
}
