//! Ledger fetcher implementations

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::TransportError;
use crate::LedgerIndex;

pub mod xrpl;

pub use xrpl::XrplFetcher;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Ledger index outside the range the server holds; terminal per index
    #[error("ledger {0} not found on this server")]
    NotFound(LedgerIndex),

    /// Request timed out waiting for a response
    #[error("request timed out")]
    Timeout,

    /// Response was malformed or carried an unexpected shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport-level connection failure
    #[error("connection error: {0}")]
    Connection(String),
}

impl FetchError {
    /// Whether the scheduler should retry this failure.
    ///
    /// `NotFound` means the index is permanently outside the server's
    /// available range; everything else is transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::NotFound(_))
    }
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connection(msg) => FetchError::Connection(msg),
            TransportError::Timeout(_) => FetchError::Timeout,
            TransportError::Protocol(msg) => FetchError::Protocol(msg),
        }
    }
}

/// Result type for fetcher operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Raw response for one ledger, untouched after receipt.
///
/// Owned by the fetcher until handed to the normalizer; transactions keep
/// the order the server returned them in.
#[derive(Debug, Clone)]
pub struct RawLedgerPayload {
    /// Index of the fetched ledger
    pub ledger_index: LedgerIndex,
    /// Close time in seconds since the network epoch, when reported
    pub close_time: Option<i64>,
    /// Raw transaction documents in server order
    pub transactions: Vec<Value>,
}

/// Ledger data source trait.
///
/// The executor is written against this seam so that scheduling, retry, and
/// persistence behavior can be tested without a live node.
#[async_trait]
pub trait LedgerFetcher: Send + Sync {
    /// Query the node's current ledger index. Issued once per run when the
    /// anchor is `latest`.
    async fn current_ledger_index(&self) -> FetchResult<LedgerIndex>;

    /// Fetch one ledger with full transaction expansion.
    ///
    /// No caching: each call is a fresh request.
    async fn fetch_ledger(&self, index: LedgerIndex) -> FetchResult<RawLedgerPayload>;
}
