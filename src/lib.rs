//! # XRPL Ledger Ingestion Pipeline
//!
//! A library for backfilling recent XRP Ledger history into a flat CSV
//! dataset. It connects to a public XRPL node over a persistent WebSocket
//! RPC channel, walks a ledger-index range with bounded concurrency,
//! normalizes heterogeneous transaction shapes into a canonical record, and
//! persists the result exactly once per ledger.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use xrpl_ingest::fetcher::XrplFetcher;
//! use xrpl_ingest::ingest::{Anchor, IngestExecutor};
//! use xrpl_ingest::sink::CsvSink;
//! use xrpl_ingest::transport::WsPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Arc::new(WsPool::new("wss://s1.ripple.com/"));
//! let fetcher = XrplFetcher::new(pool);
//! let mut sink = CsvSink::create("./xrp_dataset.csv")?;
//!
//! let executor = IngestExecutor::new(Anchor::Latest, 10).with_concurrency(4);
//! let summary = executor.run(&fetcher, &mut sink).await?;
//! sink.close()?;
//!
//! println!("ingested {} transactions", summary.records_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`] - WebSocket request/response client with timeout and pooling
//! - [`fetcher`] - Ledger fetching behind the [`fetcher::LedgerFetcher`] trait
//! - [`normalize`] - Pure mapping from raw transactions to [`CanonicalTransaction`]
//! - [`ingest`] - Range walking, bounded-concurrency dispatch, retry policy
//! - [`sink`] - Append-only CSV dataset with per-hash deduplication
//! - [`shutdown`] - Graceful shutdown coordination shared across tasks
//!
//! Control flow: the executor owns retries and concurrency; the fetcher and
//! normalizer are stateless transformations over one ledger at a time.

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Ledger fetchers
pub mod fetcher;

/// Range walking and ingest orchestration
pub mod ingest;

/// Raw transaction normalization
pub mod normalize;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Dataset persistence
pub mod sink;

/// WebSocket transport client
pub mod transport;

/// Monotonically increasing index identifying one ledger (block) on the
/// network. Immutable once assigned by validators.
pub type LedgerIndex = u32;

/// Seconds between the XRPL network epoch (2000-01-01T00:00:00Z) and the
/// Unix epoch. Ledger close times are expressed as offsets from the network
/// epoch and must be shifted by this constant to obtain calendar time.
pub const XRPL_EPOCH_OFFSET_SECS: i64 = 946_684_800;

/// Marker written to the dataset when a ledger carries no close time.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Canonical transaction record produced by normalization.
///
/// One row of the output dataset. Field defaults for missing or malformed
/// raw data are documented on [`normalize::normalize`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalTransaction {
    /// Transaction hash, unique across the dataset
    pub hash: String,
    /// Index of the ledger that closed this transaction
    pub ledger_index: LedgerIndex,
    /// Ledger close time in UTC; `None` when the ledger reported no close time
    pub timestamp: Option<DateTime<Utc>>,
    /// Sending account; empty string when the raw transaction omits it
    pub from: String,
    /// Destination account; the sentinel `"XRPL"` when absent
    pub to: String,
    /// Transferred amount; zero when absent or unparsable
    pub value: Decimal,
    /// Whether the transaction failed to apply
    pub is_error: bool,
}

impl CanonicalTransaction {
    /// Render the close time for output, `"Unknown"` when absent.
    pub fn timestamp_display(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => UNKNOWN_TIMESTAMP.to_string(),
        }
    }

    /// Validate record invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.hash.is_empty() {
            return Err("Transaction hash cannot be empty".to_string());
        }

        if self.value.is_sign_negative() {
            return Err(format!("Value must be non-negative, got {}", self.value));
        }

        Ok(())
    }
}
