//! Range walking and ingest orchestration.
//!
//! The ingest engine resolves the target ledger range, dispatches per-ledger
//! fetch+normalize tasks with bounded concurrency, applies the retry policy,
//! and hands completed ledgers to the sink in deterministic order.
//!
//! # Overview
//!
//! 1. **Anchor resolution**: [`Anchor::Latest`] queries the node once for
//!    the current ledger index; an explicit anchor is used as-is. Both walk
//!    backward for the requested count.
//! 2. **Dispatch**: a bounded concurrent task set; the concurrency limit is
//!    the single rate-control knob.
//! 3. **Retry**: transient failures back off exponentially up to the attempt
//!    bound; a ledger outside the server's range is recorded as a gap with
//!    no retry. A failed ledger never aborts the run.
//! 4. **Handoff**: completed ledgers are accumulated by a single writer and
//!    appended to the sink in ascending-index order once the walk finishes,
//!    regardless of completion order.
//!
//! # Error Handling
//!
//! Per-ledger failures become recorded gaps in the [`task::RunSummary`].
//! Only two things fail a run outright: the anchor cannot be resolved, or
//! the sink reports an I/O failure.

use std::fmt;
use std::str::FromStr;

use crate::fetcher::FetchError;
use crate::sink::SinkError;
use crate::LedgerIndex;

pub mod config;
pub mod executor;
pub mod task;

pub use executor::IngestExecutor;
pub use task::{CompletedLedger, FetchTask, LedgerGap, RunSummary, TaskState};

/// Starting point of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Resolve the node's current validated ledger index at run start
    Latest,
    /// Walk backward from an explicit ledger index
    Index(LedgerIndex),
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Anchor::Latest);
        }
        s.parse::<LedgerIndex>()
            .map(Anchor::Index)
            .map_err(|_| format!("Invalid anchor: {s}. Expected \"latest\" or a ledger index"))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Latest => write!(f, "latest"),
            Anchor::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Errors that abort an ingest run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The `latest` anchor could not be resolved
    #[error("failed to resolve the latest ledger index: {0}")]
    AnchorResolution(#[source] FetchError),

    /// The sink failed; reports how far persistence got before the failure
    #[error(
        "sink failure after persisting {persisted_ledgers} ledgers ({persisted_records} records): {source}"
    )]
    Sink {
        /// Underlying sink error
        #[source]
        source: SinkError,
        /// Ledgers fully persisted before the failure
        persisted_ledgers: u64,
        /// Records persisted before the failure
        persisted_records: u64,
    },
}
