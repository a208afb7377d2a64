//! Main entry point for the xrpl-ingest CLI

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use xrpl_ingest::cli::Cli;
use xrpl_ingest::shutdown::{self, ShutdownCoordinator};

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("xrpl_ingest=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Install global shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight fetches...");
                shutdown.request_shutdown();
            }
        }
    });

    let result = cli
        .execute(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!(e));

    match result {
        Ok(summary) => {
            // Partial success is not a hard failure; surface it and exit clean
            if !summary.is_full_success() {
                warn!(
                    gaps = summary.gaps.len(),
                    cancelled = summary.cancelled.len(),
                    "Run finished with unfetched ledgers"
                );
            }
        }
        Err(e) => {
            error!("Ingest failed: {}", e);
            std::process::exit(1);
        }
    }
}
