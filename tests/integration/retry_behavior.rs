//! Retry policy behavior under scripted transient and permanent failures

use tempfile::TempDir;
use xrpl_ingest::fetcher::FetchError;
use xrpl_ingest::ingest::{Anchor, IngestExecutor};
use xrpl_ingest::sink::CsvSink;

use super::support::{payment, MockFetcher};

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let fetcher = MockFetcher::new(1000)
        .with_ledger(1000, Some(0), vec![payment("A", "r1", "r2", "1")])
        .with_failures(
            1000,
            vec![
                FetchError::Timeout,
                FetchError::Connection("reset by peer".to_string()),
            ],
        );

    let temp_dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(temp_dir.path().join("out.csv")).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 1).with_max_attempts(3);
    let summary = executor.run(&fetcher, &mut sink).await.unwrap();

    assert!(summary.is_full_success());
    assert_eq!(fetcher.calls_for(1000), 3);
    assert_eq!(summary.attempts_for(1000), Some(3));
    assert_eq!(summary.records_written, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_become_a_gap_not_an_error() {
    let fetcher = MockFetcher::new(1000)
        .with_ledger(1000, Some(0), vec![payment("A", "r1", "r2", "1")])
        .with_ledger(999, Some(0), vec![payment("B", "r3", "r4", "2")])
        .with_failures(
            999,
            vec![FetchError::Timeout, FetchError::Timeout, FetchError::Timeout],
        );

    let temp_dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(temp_dir.path().join("out.csv")).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 2).with_max_attempts(3);
    let summary = executor.run(&fetcher, &mut sink).await.unwrap();

    assert!(!summary.is_full_success());
    assert_eq!(fetcher.calls_for(999), 3);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].index, 999);
    assert_eq!(summary.gaps[0].attempts, 3);

    // The healthy neighbor still lands
    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.completed[0].index, 1000);
    assert_eq!(summary.records_written, 1);
}

#[tokio::test]
async fn not_found_is_never_retried() {
    let fetcher = MockFetcher::new(1000)
        .with_ledger(1000, Some(0), vec![payment("A", "r1", "r2", "1")]);
    // index 999 has no stored ledger, so the fetcher reports NotFound

    let temp_dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(temp_dir.path().join("out.csv")).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 2).with_max_attempts(5);
    let summary = executor.run(&fetcher, &mut sink).await.unwrap();

    assert_eq!(fetcher.calls_for(999), 1);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].index, 999);
    assert_eq!(summary.gaps[0].attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn one_bad_ledger_does_not_block_the_rest() {
    let fetcher = MockFetcher::new(1002)
        .with_ledger(1002, Some(0), vec![payment("A", "r1", "r2", "1")])
        .with_ledger(1001, Some(0), vec![payment("B", "r3", "r4", "2")])
        .with_ledger(1000, Some(0), vec![payment("C", "r5", "r6", "3")])
        .with_failures(
            1001,
            vec![
                FetchError::Protocol("malformed response".to_string()),
                FetchError::Protocol("malformed response".to_string()),
            ],
        );

    let temp_dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(temp_dir.path().join("out.csv")).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 3)
        .with_max_attempts(2)
        .with_concurrency(1);
    let summary = executor.run(&fetcher, &mut sink).await.unwrap();

    assert_eq!(summary.completed.len(), 2);
    assert_eq!(summary.gaps.len(), 1);
    assert_eq!(summary.gaps[0].index, 1001);
    assert_eq!(summary.records_written, 2);
}
