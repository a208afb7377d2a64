//! Fetch task structures and run summary

use serde::Serialize;

use crate::fetcher::FetchError;
use crate::{CanonicalTransaction, LedgerIndex};

/// Lifecycle state of one per-ledger fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Task has not been dispatched yet
    #[default]
    Pending,
    /// Task is currently fetching (including retry backoff)
    InFlight,
    /// Ledger fetched and normalized
    Succeeded,
    /// Retries exhausted or index not available
    Failed,
}

/// One unit of work: fetch and normalize a single ledger.
#[derive(Debug, Clone)]
pub struct FetchTask {
    /// Target ledger index
    pub index: LedgerIndex,
    /// Fetch attempts made so far
    pub attempts: u32,
    /// Current lifecycle state
    pub state: TaskState,
}

impl FetchTask {
    /// Create a pending task for one ledger index.
    pub fn new(index: LedgerIndex) -> Self {
        Self {
            index,
            attempts: 0,
            state: TaskState::Pending,
        }
    }
}

/// Terminal result of one task after its retry policy is resolved.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    /// Ledger fetched and normalized
    Completed {
        index: LedgerIndex,
        attempts: u32,
        transactions: Vec<CanonicalTransaction>,
    },
    /// Permanent per-index failure, recorded and surfaced
    Gap {
        index: LedgerIndex,
        attempts: u32,
        reason: FetchError,
    },
    /// Task abandoned because shutdown was requested
    Cancelled { index: LedgerIndex },
}

/// A ledger that made it into the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedLedger {
    /// Ledger index
    pub index: LedgerIndex,
    /// Fetch attempts used (1 means first try succeeded)
    pub attempts: u32,
    /// Normalized transactions the ledger contributed
    pub transactions: usize,
}

/// A ledger the run could not ingest.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerGap {
    /// Ledger index
    pub index: LedgerIndex,
    /// Fetch attempts made before giving up
    pub attempts: u32,
    /// Why the ledger was abandoned
    pub reason: String,
}

/// Final accounting for one ingest run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunSummary {
    /// Number of ledger indices the walk targeted
    pub requested: u64,
    /// Ledgers persisted, ascending by index
    pub completed: Vec<CompletedLedger>,
    /// Ledgers abandoned after the retry policy, ascending by index
    pub gaps: Vec<LedgerGap>,
    /// Ledgers abandoned because shutdown was requested, ascending. An
    /// index cancelled during retry backoff has been attempted at least
    /// once; one cancelled before dispatch was never fetched.
    pub cancelled: Vec<LedgerIndex>,
    /// Rows written to the dataset
    pub records_written: u64,
    /// Duplicate-hash rows the sink skipped
    pub duplicates_skipped: u64,
}

impl RunSummary {
    /// Whether every requested ledger was ingested.
    pub fn is_full_success(&self) -> bool {
        self.gaps.is_empty() && self.cancelled.is_empty()
    }

    /// Attempts used for a completed ledger, if it completed.
    pub fn attempts_for(&self, index: LedgerIndex) -> Option<u32> {
        self.completed
            .iter()
            .find(|c| c.index == index)
            .map(|c| c.attempts)
    }
}
