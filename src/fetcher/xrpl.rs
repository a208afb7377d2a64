//! XRPL node fetcher.
//!
//! Issues the two RPC shapes the pipeline consumes (`ledger_current` and
//! `ledger` with full transaction expansion) and unwraps the XRPL result
//! envelope into typed payloads. Parsing is stateless so it can be tested
//! against captured responses without a socket.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::fetcher::{FetchError, FetchResult, LedgerFetcher, RawLedgerPayload};
use crate::transport::WsPool;
use crate::LedgerIndex;

/// Error code an XRPL node reports for a ledger index outside its range.
const LEDGER_NOT_FOUND_CODE: &str = "lgrNotFound";

/// Fetcher for a single XRPL node reached through a [`WsPool`].
pub struct XrplFetcher {
    pool: Arc<WsPool>,
}

impl XrplFetcher {
    /// Create a fetcher over a shared connection pool.
    pub fn new(pool: Arc<WsPool>) -> Self {
        Self { pool }
    }

    /// Unwrap the XRPL response envelope, mapping API error codes.
    ///
    /// Success responses carry `"status": "success"` and a `result` object;
    /// failures carry `"status": "error"` and an `error` code string.
    fn unwrap_envelope(response: Value, index: Option<LedgerIndex>) -> FetchResult<Value> {
        if response.get("status").and_then(Value::as_str) == Some("error") {
            let code = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return match (code, index) {
                (LEDGER_NOT_FOUND_CODE, Some(index)) => Err(FetchError::NotFound(index)),
                _ => Err(FetchError::Protocol(format!("server error: {code}"))),
            };
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| FetchError::Protocol("response has no result envelope".to_string()))
    }

    /// Parse a `ledger_current` result into the current ledger index.
    fn parse_current_index(response: Value) -> FetchResult<LedgerIndex> {
        let result = Self::unwrap_envelope(response, None)?;
        result
            .get("ledger_current_index")
            .and_then(Value::as_u64)
            .and_then(|idx| LedgerIndex::try_from(idx).ok())
            .ok_or_else(|| {
                FetchError::Protocol("result has no ledger_current_index".to_string())
            })
    }

    /// Parse a `ledger` result into a raw payload.
    fn parse_ledger(index: LedgerIndex, response: Value) -> FetchResult<RawLedgerPayload> {
        let result = Self::unwrap_envelope(response, Some(index))?;
        let ledger = result
            .get("ledger")
            .ok_or_else(|| FetchError::Protocol("result has no ledger object".to_string()))?;

        let close_time = ledger.get("close_time").and_then(Value::as_i64);
        let transactions = ledger
            .get("transactions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(RawLedgerPayload {
            ledger_index: index,
            close_time,
            transactions,
        })
    }
}

#[async_trait]
impl LedgerFetcher for XrplFetcher {
    async fn current_ledger_index(&self) -> FetchResult<LedgerIndex> {
        let request = json!({ "command": "ledger_current" });
        let response = self.pool.request(&request).await?;
        let index = Self::parse_current_index(response)?;
        debug!(index, "resolved current ledger index");
        Ok(index)
    }

    async fn fetch_ledger(&self, index: LedgerIndex) -> FetchResult<RawLedgerPayload> {
        let request = json!({
            "command": "ledger",
            "ledger_index": index,
            "transactions": true,
            "expand": true,
        });
        let response = self.pool.request(&request).await?;
        let payload = Self::parse_ledger(index, response)?;
        debug!(
            index,
            transactions = payload.transactions.len(),
            "fetched ledger"
        );
        Ok(payload)
    }
}
