pub mod config;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod provider;
pub mod services;

// Re-export commonly used types and functions
pub use config::*;
pub use errors::*;
pub use models::*;

// Re-export the transport seam and the orchestration surface
pub use provider::{AwsProviderClient, ProviderClient, ProviderError};
pub use services::{EventSyncService, PolicyCache, SyncReport, UnitFailure};
