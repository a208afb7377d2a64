//! Normalization rules exercised through the public API

use rust_decimal::Decimal;
use serde_json::json;
use xrpl_ingest::fetcher::RawLedgerPayload;
use xrpl_ingest::normalize::{normalize_ledger, DEFAULT_RECEIVER, SUCCESS_RESULT_CODE};

#[test]
fn mixed_ledger_normalizes_every_shape_in_one_pass() {
    let payload = RawLedgerPayload {
        ledger_index: 95_000_000,
        close_time: Some(0),
        transactions: vec![
            // Plain XRP payment, drops as a string
            json!({
                "hash": "H1",
                "Account": "r1",
                "Destination": "r2",
                "Amount": "1000000",
                "meta": { "TransactionResult": SUCCESS_RESULT_CODE }
            }),
            // Issued currency, nested value, legacy metadata key
            json!({
                "hash": "H2",
                "Account": "r3",
                "Destination": "r4",
                "Amount": { "currency": "EUR", "issuer": "r5", "value": "7.77" },
                "metaData": { "TransactionResult": SUCCESS_RESULT_CODE }
            }),
            // Non-payment: no Destination, no Amount, failed result
            json!({
                "hash": "H3",
                "Account": "r6",
                "meta": { "TransactionResult": "tefPAST_SEQ" }
            }),
            // Ledger entry that is not a transaction
            json!({ "LedgerEntryType": "AccountRoot" }),
        ],
    };

    let txs = normalize_ledger(&payload);
    assert_eq!(txs.len(), 3);

    assert_eq!(txs[0].hash, "H1");
    assert_eq!(txs[0].value, Decimal::from(1_000_000));
    assert!(!txs[0].is_error);

    assert_eq!(txs[1].value, "7.77".parse::<Decimal>().unwrap());
    assert!(!txs[1].is_error);

    assert_eq!(txs[2].to, DEFAULT_RECEIVER);
    assert_eq!(txs[2].value, Decimal::ZERO);
    assert!(txs[2].is_error);

    for tx in &txs {
        assert_eq!(tx.ledger_index, 95_000_000);
        assert_eq!(tx.timestamp_display(), "2000-01-01 00:00:00");
    }
}

#[test]
fn string_and_numeric_drops_normalize_identically() {
    let payload = RawLedgerPayload {
        ledger_index: 1,
        close_time: None,
        transactions: vec![
            json!({ "hash": "S", "Account": "r1", "Amount": "500" }),
            json!({ "hash": "N", "Account": "r1", "Amount": 500 }),
        ],
    };
    let txs = normalize_ledger(&payload);
    assert_eq!(txs[0].value, txs[1].value);
    assert_eq!(txs[0].value, Decimal::from(500));
}

#[test]
fn records_validate_after_normalization() {
    let payload = RawLedgerPayload {
        ledger_index: 1,
        close_time: Some(0),
        transactions: vec![json!({
            "hash": "H",
            "Account": "r1",
            "Destination": "r2",
            "Amount": "1",
            "meta": { "TransactionResult": SUCCESS_RESULT_CODE }
        })],
    };
    for tx in normalize_ledger(&payload) {
        assert!(tx.validate().is_ok());
    }
}
