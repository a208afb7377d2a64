//! Raw transaction normalization.
//!
//! Stateless mapping from the heterogeneous transaction documents an XRPL
//! node returns to [`CanonicalTransaction`] records. Normalization never
//! fails: every malformed or missing sub-field collapses to a documented
//! default so that one bad transaction cannot poison a ledger.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::fetcher::RawLedgerPayload;
use crate::{CanonicalTransaction, LedgerIndex, XRPL_EPOCH_OFFSET_SECS};

/// Receiver recorded when a transaction carries no `Destination` field,
/// e.g. non-payment transaction types.
pub const DEFAULT_RECEIVER: &str = "XRPL";

/// Result code the network reports for a successfully applied transaction.
pub const SUCCESS_RESULT_CODE: &str = "tesSUCCESS";

/// The two amount shapes the network produces: XRP amounts are scalar drop
/// counts (string, occasionally numeric), issued-currency amounts nest the
/// decimal under `value`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Drops(String),
    Numeric(serde_json::Number),
    Issued { value: String },
}

/// Convert a ledger close time to UTC calendar time.
///
/// Close times count seconds from the network epoch; `None` in means the
/// ledger reported no close time and `None` comes back out.
pub fn close_time_to_utc(close_time: Option<i64>) -> Option<DateTime<Utc>> {
    close_time.and_then(|secs| DateTime::from_timestamp(secs + XRPL_EPOCH_OFFSET_SECS, 0))
}

/// Extract a non-negative decimal amount from either amount shape.
///
/// Thousands separators are stripped before parsing. Absent, unparsable,
/// or negative amounts all collapse to zero.
fn parse_amount(raw: Option<&Value>) -> Decimal {
    let Some(raw) = raw else {
        return Decimal::ZERO;
    };

    let text = match serde_json::from_value::<RawAmount>(raw.clone()) {
        Ok(RawAmount::Drops(s)) => s,
        Ok(RawAmount::Numeric(n)) => n.to_string(),
        Ok(RawAmount::Issued { value }) => value,
        Err(_) => return Decimal::ZERO,
    };

    let cleaned = text.replace(',', "");
    match Decimal::from_str(&cleaned) {
        Ok(value) if !value.is_sign_negative() => value,
        _ => Decimal::ZERO,
    }
}

/// Look up the transaction result code.
///
/// Metadata lives under `meta` on current servers and `metaData` on older
/// ones; both keys are checked, skipping explicit nulls.
fn result_code(tx: &Value) -> Option<&str> {
    let meta = tx
        .get("meta")
        .filter(|m| !m.is_null())
        .or_else(|| tx.get("metaData").filter(|m| !m.is_null()))?;
    meta.get("TransactionResult")?.as_str()
}

/// Normalize one raw transaction into a canonical record.
///
/// Returns `None` only for entries without a `hash` field (ledgers can
/// carry non-transaction entries); those are skipped, not errored.
///
/// Field defaults:
/// - `from`: empty string when `Account` is absent; the record is still
///   emitted
/// - `to`: [`DEFAULT_RECEIVER`] when `Destination` is absent
/// - `value`: zero when `Amount` is absent, unparsable, or negative
/// - `is_error`: `true` unless the result code equals
///   [`SUCCESS_RESULT_CODE`], including when no result code is present
/// - `timestamp`: `None` when the ledger close time is absent
pub fn normalize(
    tx: &Value,
    ledger_index: LedgerIndex,
    close_time: Option<i64>,
) -> Option<CanonicalTransaction> {
    let hash = tx.get("hash")?.as_str()?.to_string();

    let from = tx
        .get("Account")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let to = tx
        .get("Destination")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_RECEIVER)
        .to_string();
    let value = parse_amount(tx.get("Amount"));
    let is_error = result_code(tx) != Some(SUCCESS_RESULT_CODE);

    Some(CanonicalTransaction {
        hash,
        ledger_index,
        timestamp: close_time_to_utc(close_time),
        from,
        to,
        value,
        is_error,
    })
}

/// Normalize every transaction in a raw ledger payload, preserving server
/// order and skipping non-transaction entries.
pub fn normalize_ledger(payload: &RawLedgerPayload) -> Vec<CanonicalTransaction> {
    payload
        .transactions
        .iter()
        .filter_map(|tx| normalize(tx, payload.ledger_index, payload.close_time))
        .collect()
}
