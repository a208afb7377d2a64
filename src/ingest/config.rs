//! Ingest configuration constants

use std::time::Duration;

/// Maximum fetch attempts per ledger for transient failures.
/// Three attempts with exponential backoff recovers from momentary node
/// trouble without stalling the whole walk on a persistently bad index.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Default number of concurrent in-flight ledger fetches.
/// Small by default to respect public-node rate limits.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Maximum allowed concurrency to prevent self-inflicted rate limiting.
pub const MAX_CONCURRENCY: usize = 32;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
/// Caps exponential growth so a retried index never waits more than 30s.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS * 2u64.pow(retry_count);
    let delay_ms = delay_ms.min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
