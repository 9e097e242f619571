use clap::Parser;
use s3_events_cli::{S3EventsCli, run};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let json_format = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "plain".to_string())
        .to_lowercase()
        == "json";
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = S3EventsCli::parse();
    match run(cli).await {
        Ok(report) if report.is_success() => Ok(()),
        Ok(report) => {
            for failure in &report.failures {
                error!(unit = %failure.unit, error = %failure.error, "unit failed");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("trigger sync failed: {e:#}");
            std::process::exit(1);
        }
    }
}
