//! Dataset file properties after a full pipeline run

use serde_json::json;
use tempfile::TempDir;
use xrpl_ingest::ingest::{Anchor, IngestExecutor};
use xrpl_ingest::sink::CsvSink;

use super::support::MockFetcher;

#[tokio::test]
async fn dataset_columns_survive_the_full_pipeline() {
    let fetcher = MockFetcher::new(1000).with_ledger(
        1000,
        Some(86_400),
        vec![
            json!({
                "hash": "OK",
                "Account": "rSender",
                "Destination": "rReceiver",
                "Amount": "12.5",
                "meta": { "TransactionResult": "tesSUCCESS" }
            }),
            json!({
                "hash": "FAILED",
                "Account": "rSender",
                "Amount": { "currency": "USD", "issuer": "rIssuer", "value": "3.25" },
                "meta": { "TransactionResult": "tecUNFUNDED_PAYMENT" }
            }),
        ],
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.csv");
    let mut sink = CsvSink::create(&path).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 1);
    executor.run(&fetcher, &mut sink).await.unwrap();
    sink.close().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "TxHash,BlockHeight,TimeStamp,From,To,Value,isError");
    assert_eq!(lines[1], "OK,1000,2000-01-02 00:00:00,rSender,rReceiver,12.5,0");
    // No Destination: the receiver column falls back to the network name
    assert_eq!(lines[2], "FAILED,1000,2000-01-02 00:00:00,rSender,XRPL,3.25,1");
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn missing_close_time_renders_unknown_timestamp() {
    let fetcher = MockFetcher::new(1000).with_ledger(
        1000,
        None,
        vec![json!({
            "hash": "NOCLOSE",
            "Account": "rSender",
            "Amount": "1",
            "meta": { "TransactionResult": "tesSUCCESS" }
        })],
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.csv");
    let mut sink = CsvSink::create(&path).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 1);
    executor.run(&fetcher, &mut sink).await.unwrap();
    sink.close().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents.lines().nth(1).unwrap(),
        "NOCLOSE,1000,Unknown,rSender,XRPL,1,0"
    );
}

#[tokio::test]
async fn entries_without_a_hash_never_reach_the_dataset() {
    let fetcher = MockFetcher::new(1000).with_ledger(
        1000,
        Some(0),
        vec![
            json!({ "Flags": 0 }),
            json!({
                "hash": "REAL",
                "Account": "rSender",
                "Amount": "1",
                "meta": { "TransactionResult": "tesSUCCESS" }
            }),
        ],
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.csv");
    let mut sink = CsvSink::create(&path).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 1);
    let summary = executor.run(&fetcher, &mut sink).await.unwrap();
    sink.close().unwrap();

    assert_eq!(summary.records_written, 1);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
    assert!(contents.contains("REAL"));
}

#[test]
fn sink_creates_missing_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("deep").join("out.csv");

    let sink = CsvSink::create(&path).unwrap();
    assert_eq!(sink.path(), path);
    sink.close().unwrap();
    assert!(path.exists());
}
