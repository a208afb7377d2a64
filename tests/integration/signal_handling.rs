//! Shutdown coordinator semantics

use std::time::Duration;

use tempfile::TempDir;
use xrpl_ingest::ingest::{Anchor, IngestExecutor};
use xrpl_ingest::shutdown::ShutdownCoordinator;
use xrpl_ingest::sink::CsvSink;

use super::support::{payment, MockFetcher};

#[tokio::test]
async fn wait_returns_immediately_when_already_requested() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    assert!(shutdown.is_shutdown_requested());

    // Must not hang
    tokio::time::timeout(Duration::from_secs(1), shutdown.wait_for_shutdown())
        .await
        .expect("wait_for_shutdown should return immediately");
}

#[tokio::test]
async fn waiters_registered_before_request_are_notified() {
    let shutdown = ShutdownCoordinator::shared();

    let waiter = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_shutdown().await }
    });

    // Give the waiter a chance to register before signalling
    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown.request_shutdown();

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be notified")
        .unwrap();
}

#[tokio::test]
async fn repeated_requests_are_idempotent() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    shutdown.request_shutdown();
    assert!(shutdown.is_shutdown_requested());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_backoff_cancels_the_waiting_task() {
    use xrpl_ingest::fetcher::FetchError;

    // Every attempt times out, so the task keeps entering backoff
    let fetcher = MockFetcher::new(1000)
        .with_ledger(1000, Some(0), vec![payment("A", "r1", "r2", "1")])
        .with_failures(
            1000,
            vec![FetchError::Timeout, FetchError::Timeout, FetchError::Timeout],
        );

    let shutdown = ShutdownCoordinator::shared();
    let temp_dir = TempDir::new().unwrap();
    let mut sink = CsvSink::create(temp_dir.path().join("out.csv")).unwrap();

    let executor = IngestExecutor::new(Anchor::Latest, 1)
        .with_max_attempts(4)
        .with_shutdown(shutdown.clone());

    // Signal shutdown while the first backoff sleep is pending
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.request_shutdown();
    };

    let (result, ()) = tokio::join!(executor.run(&fetcher, &mut sink), trigger);
    let summary = result.unwrap();

    assert_eq!(summary.cancelled, vec![1000]);
    assert!(summary.completed.is_empty());
    assert_eq!(fetcher.calls_for(1000), 1);
}
