use std::path::PathBuf;
use std::sync::Arc;

use s3_events::config::{AppConfig, RunContext};
use s3_events::manifest::ServiceManifest;
use s3_events::provider::AwsProviderClient;
use s3_events::services::{EventSyncService, SyncReport};
use tracing::info;

#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct S3EventsCli {
    #[command(subcommand)]
    pub command: TriggerCommand,
    #[clap(flatten)]
    pub opts: RunArgs,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum TriggerCommand {
    /// Attach function notification triggers to existing buckets
    #[clap(name = "apply-triggers", aliases = &["apply"])]
    ApplyTriggers,
    /// Remove previously attached triggers from existing buckets
    #[clap(name = "remove-triggers", aliases = &["remove"])]
    RemoveTriggers,
}

#[derive(clap::Args, Clone, Debug)]
pub struct RunArgs {
    /// Stage of the service
    #[arg(short, long, global = true)]
    pub stage: Option<String>,
    /// Region of the service
    #[arg(short, long, global = true)]
    pub region: Option<String>,
    /// Path to the deployment manifest
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,
}

pub async fn run(cli: S3EventsCli) -> anyhow::Result<SyncReport> {
    let config = AppConfig::load_from_env()?;
    let manifest_path = cli
        .opts
        .manifest
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.manifest_path));
    let manifest = ServiceManifest::from_file(&manifest_path)?;
    let ctx = RunContext::resolve(
        cli.opts.stage.as_deref(),
        cli.opts.region.as_deref(),
        &config,
        &manifest,
    );
    info!(
        service = %manifest.service,
        stage = %ctx.stage,
        region = %ctx.region,
        "syncing bucket triggers"
    );

    let provider = AwsProviderClient::connect(&ctx.region).await;

    let report = match cli.command {
        TriggerCommand::ApplyTriggers => {
            let stack_name = format!("{}-{}", manifest.service, ctx.stage);
            let outputs = provider.fetch_stack_outputs(&stack_name).await?;
            let service = EventSyncService::new(Arc::new(provider));
            service.apply(&manifest, &outputs, &ctx).await?
        }
        TriggerCommand::RemoveTriggers => {
            let service = EventSyncService::new(Arc::new(provider));
            service.teardown(&manifest).await?
        }
    };
    Ok(report)
}
