//! Ingest executor: bounded-concurrency walk with typed retry policy

use std::collections::BTreeMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn, Instrument};

use crate::fetcher::LedgerFetcher;
use crate::ingest::config::{calculate_backoff, DEFAULT_CONCURRENCY, MAX_FETCH_ATTEMPTS};
use crate::ingest::task::{CompletedLedger, FetchTask, LedgerGap, RunSummary, TaskOutcome, TaskState};
use crate::ingest::{Anchor, IngestError};
use crate::normalize::normalize_ledger;
use crate::shutdown::{self, SharedShutdown};
use crate::sink::CsvSink;
use crate::{CanonicalTransaction, LedgerIndex};

/// Orchestrates one ingest run over a ledger range.
pub struct IngestExecutor {
    anchor: Anchor,
    count: u32,
    concurrency: usize,
    max_attempts: u32,
    shutdown: Option<SharedShutdown>,
}

impl IngestExecutor {
    /// Create an executor targeting `count` consecutive ledgers ending at
    /// the anchor.
    pub fn new(anchor: Anchor, count: u32) -> Self {
        Self {
            anchor,
            count,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: MAX_FETCH_ATTEMPTS,
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Set the bound on concurrent in-flight fetches.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-ledger attempt bound for transient failures.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Execute the walk and persist completed ledgers to the sink.
    ///
    /// The walk never aborts on a per-ledger failure; gaps and cancelled
    /// indices are reported in the summary. Only anchor resolution and sink
    /// failures are fatal.
    pub async fn run(
        &self,
        fetcher: &dyn LedgerFetcher,
        sink: &mut CsvSink,
    ) -> Result<RunSummary, IngestError> {
        let span = tracing::info_span!(
            "ingest_run",
            anchor = %self.anchor,
            count = self.count,
            concurrency = self.concurrency
        );
        self.run_inner(fetcher, sink).instrument(span).await
    }

    async fn run_inner(
        &self,
        fetcher: &dyn LedgerFetcher,
        sink: &mut CsvSink,
    ) -> Result<RunSummary, IngestError> {
        let anchor_index = match self.anchor {
            Anchor::Latest => fetcher
                .current_ledger_index()
                .await
                .map_err(IngestError::AnchorResolution)?,
            Anchor::Index(index) => index,
        };
        info!(anchor_index, "Resolved starting ledger index");

        // Walk backward; stop early if the range would underflow index 0.
        let indices: Vec<LedgerIndex> = (0..self.count)
            .map_while(|offset| anchor_index.checked_sub(offset))
            .collect();
        let requested = indices.len() as u64;

        let outcomes = stream::iter(
            indices
                .into_iter()
                .map(|index| self.run_task(fetcher, FetchTask::new(index))),
        )
        .buffer_unordered(self.concurrency)
        .collect::<Vec<_>>()
        .await;

        // Single-writer handoff: each index contributes at most once, and
        // the sink sees ledgers in ascending order no matter how the
        // concurrent fetches interleaved.
        let mut by_index: BTreeMap<LedgerIndex, (u32, Vec<CanonicalTransaction>)> =
            BTreeMap::new();
        let mut summary = RunSummary {
            requested,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                TaskOutcome::Completed {
                    index,
                    attempts,
                    transactions,
                } => {
                    by_index.insert(index, (attempts, transactions));
                }
                TaskOutcome::Gap {
                    index,
                    attempts,
                    reason,
                } => summary.gaps.push(LedgerGap {
                    index,
                    attempts,
                    reason: reason.to_string(),
                }),
                TaskOutcome::Cancelled { index } => summary.cancelled.push(index),
            }
        }
        summary.gaps.sort_unstable_by_key(|gap| gap.index);
        summary.cancelled.sort_unstable();

        let mut persisted_ledgers = 0u64;
        for (index, (attempts, transactions)) in &by_index {
            if let Err(source) = sink.append(*index, transactions) {
                let persisted_records = sink.records_written();
                return Err(IngestError::Sink {
                    source,
                    persisted_ledgers,
                    persisted_records,
                });
            }
            persisted_ledgers += 1;
            summary.completed.push(CompletedLedger {
                index: *index,
                attempts: *attempts,
                transactions: transactions.len(),
            });
        }
        summary.records_written = sink.records_written();
        summary.duplicates_skipped = sink.duplicates_skipped();

        info!(
            completed = summary.completed.len(),
            gaps = summary.gaps.len(),
            cancelled = summary.cancelled.len(),
            records = summary.records_written,
            "Ingest run finished"
        );

        Ok(summary)
    }

    /// Drive one task through its retry policy to a terminal outcome.
    async fn run_task(&self, fetcher: &dyn LedgerFetcher, mut task: FetchTask) -> TaskOutcome {
        if self.shutdown_requested() {
            return TaskOutcome::Cancelled { index: task.index };
        }
        task.state = TaskState::InFlight;

        loop {
            task.attempts += 1;
            debug!(index = task.index, attempt = task.attempts, "Fetching ledger");

            match fetcher.fetch_ledger(task.index).await {
                Ok(payload) => {
                    task.state = TaskState::Succeeded;
                    let transactions = normalize_ledger(&payload);
                    info!(
                        index = task.index,
                        transactions = transactions.len(),
                        attempts = task.attempts,
                        "Ledger fetched"
                    );
                    return TaskOutcome::Completed {
                        index: task.index,
                        attempts: task.attempts,
                        transactions,
                    };
                }
                Err(e) if e.is_retryable() && task.attempts < self.max_attempts => {
                    let backoff = calculate_backoff(task.attempts - 1);
                    warn!(
                        index = task.index,
                        attempt = task.attempts,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis(),
                        error = %e,
                        "Retrying ledger fetch after backoff"
                    );
                    if !self.sleep_backoff(backoff).await {
                        return TaskOutcome::Cancelled { index: task.index };
                    }
                }
                Err(e) => {
                    task.state = TaskState::Failed;
                    if e.is_retryable() {
                        error!(
                            index = task.index,
                            attempts = task.attempts,
                            error = %e,
                            "Giving up on ledger after max attempts"
                        );
                    } else {
                        warn!(index = task.index, error = %e, "Ledger not available; recording gap");
                    }
                    return TaskOutcome::Gap {
                        index: task.index,
                        attempts: task.attempts,
                        reason: e,
                    };
                }
            }
        }
    }

    /// Sleep for the backoff duration, racing the shutdown signal.
    /// Returns false when shutdown interrupted the wait.
    async fn sleep_backoff(&self, backoff: Duration) -> bool {
        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => true,
                    _ = shutdown.wait_for_shutdown() => false,
                }
            }
            None => {
                tokio::time::sleep(backoff).await;
                true
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
