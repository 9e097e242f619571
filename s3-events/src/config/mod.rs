use anyhow::Result;
use envconfig::Envconfig;

use crate::manifest::ServiceManifest;

pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Envconfig)]
pub struct AppConfig {
    #[envconfig(from = "S3_EVENTS_STAGE")]
    pub stage: Option<String>,

    #[envconfig(from = "S3_EVENTS_REGION")]
    pub region: Option<String>,

    #[envconfig(from = "S3_EVENTS_MANIFEST", default = "manifest.json")]
    pub manifest_path: String,

    #[envconfig(from = "LOG_FORMAT", default = "plain")]
    pub log_format: String,
}

impl AppConfig {
    /// Load configuration from environment variables only
    pub fn load_from_env() -> Result<Self> {
        Ok(Self::init_from_env()?)
    }
}

/// Resolved execution context for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub stage: String,
    pub region: String,
}

impl RunContext {
    /// Precedence: CLI flag, then environment, then the manifest provider
    /// block, then the defaults.
    pub fn resolve(
        cli_stage: Option<&str>,
        cli_region: Option<&str>,
        config: &AppConfig,
        manifest: &ServiceManifest,
    ) -> Self {
        let stage = cli_stage
            .map(str::to_string)
            .or_else(|| config.stage.clone())
            .or_else(|| manifest.provider.stage.clone())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string());
        let region = cli_region
            .map(str::to_string)
            .or_else(|| config.region.clone())
            .or_else(|| manifest.provider.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self { stage, region }
    }
}
