//! Ingest command implementation

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::fetcher::XrplFetcher;
use crate::ingest::config::MAX_CONCURRENCY;
use crate::ingest::{Anchor, IngestExecutor, RunSummary};
use crate::shutdown::SharedShutdown;
use crate::sink::CsvSink;
use crate::transport::WsPool;

use super::CliError;

/// Parse and validate the concurrency value.
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Parse the anchor argument: "latest" or an explicit ledger index.
fn parse_anchor(s: &str) -> Result<Anchor, String> {
    Anchor::from_str(s)
}

/// XRPL ledger ingestion CLI
#[derive(Parser, Debug)]
#[command(name = "xrpl-ingest")]
#[command(about = "Backfill recent XRP Ledger transactions into a CSV dataset", long_about = None)]
#[command(version)]
pub struct Cli {
    /// WebSocket endpoint of the XRPL node
    #[arg(long, default_value = "wss://s1.ripple.com/")]
    pub endpoint: String,

    /// Number of consecutive ledgers to ingest
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Starting anchor: "latest" or an explicit ledger index; the walk
    /// covers the `count` ledgers ending at the anchor
    #[arg(long, default_value = "latest", value_parser = parse_anchor)]
    pub anchor: Anchor,

    /// Number of concurrent ledger fetches (default: 4, max: 32)
    #[arg(long, default_value = "4", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Maximum fetch attempts per ledger for transient failures
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Output CSV path
    #[arg(long, default_value = "xrp_dataset.csv")]
    pub output: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,
}

impl Cli {
    /// Run the ingest pipeline end to end.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<RunSummary, CliError> {
        let pool = Arc::new(WsPool::with_timeout(
            self.endpoint.clone(),
            Duration::from_secs(self.request_timeout_secs),
        ));
        let fetcher = XrplFetcher::new(pool);
        let mut sink = CsvSink::create(&self.output)?;

        let executor = IngestExecutor::new(self.anchor, self.count)
            .with_concurrency(self.concurrency)
            .with_max_attempts(self.max_attempts)
            .with_shutdown(shutdown);

        let summary = executor.run(&fetcher, &mut sink).await?;
        sink.close()?;

        self.report(&summary);
        Ok(summary)
    }

    fn report(&self, summary: &RunSummary) {
        info!(
            requested = summary.requested,
            completed = summary.completed.len(),
            records = summary.records_written,
            duplicates_skipped = summary.duplicates_skipped,
            output = %self.output.display(),
            "Dataset written"
        );

        for gap in &summary.gaps {
            warn!(
                index = gap.index,
                attempts = gap.attempts,
                reason = %gap.reason,
                "Ledger not ingested"
            );
        }
        if !summary.cancelled.is_empty() {
            warn!(
                cancelled = summary.cancelled.len(),
                "Run stopped early; some ledgers were never fetched"
            );
        }
    }
}
