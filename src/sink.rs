//! CSV dataset sink.
//!
//! Append-only writer for the output dataset. Rows are keyed uniquely by
//! transaction hash; duplicates are skipped and counted rather than
//! written twice, so replaying a ledger range against an existing sink is
//! idempotent.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use tracing::{debug, info};

use crate::{CanonicalTransaction, LedgerIndex};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Flush the writer every N records.
const FLUSH_INTERVAL: u64 = 1_000;

/// Sink errors. Any of these is fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// CSV row in the dataset's fixed column order.
#[derive(Debug, Serialize)]
struct TxRecord<'a> {
    #[serde(rename = "TxHash")]
    tx_hash: &'a str,
    #[serde(rename = "BlockHeight")]
    block_height: LedgerIndex,
    #[serde(rename = "TimeStamp")]
    time_stamp: String,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "isError")]
    is_error: u8,
}

impl<'a> From<&'a CanonicalTransaction> for TxRecord<'a> {
    fn from(tx: &'a CanonicalTransaction) -> Self {
        Self {
            tx_hash: &tx.hash,
            block_height: tx.ledger_index,
            time_stamp: tx.timestamp_display(),
            from: &tx.from,
            to: &tx.to,
            value: tx.value.to_string(),
            is_error: u8::from(tx.is_error),
        }
    }
}

/// CSV writer for canonical transactions.
pub struct CsvSink {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    records_written: u64,
    duplicates_skipped: u64,
    seen_hashes: HashSet<String>,
}

impl CsvSink {
    /// Create the output file and its parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> SinkResult<Self> {
        Self::create_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create the sink with an explicit write-buffer size.
    pub fn create_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> SinkResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV sink: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SinkError::IoError(format!("Failed to create directory: {e}"))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| SinkError::IoError(format!("Failed to create file: {e}")))?;
        let buf_writer = BufWriter::with_capacity(buffer_size, file);
        let csv_writer = Writer::from_writer(buf_writer);

        debug!("CSV sink created (header is written on first serialize)");

        Ok(Self {
            writer: csv_writer,
            path: path.to_path_buf(),
            records_written: 0,
            duplicates_skipped: 0,
            seen_hashes: HashSet::new(),
        })
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Number of duplicate-hash rows skipped.
    pub fn duplicates_skipped(&self) -> u64 {
        self.duplicates_skipped
    }

    /// Append one ledger's normalized transactions.
    ///
    /// The executor hands each ledger to the sink at most once, in
    /// ascending-index order; within a ledger the slice keeps the original
    /// transaction order. Rows whose hash was already written are skipped.
    pub fn append(
        &mut self,
        index: LedgerIndex,
        records: &[CanonicalTransaction],
    ) -> SinkResult<()> {
        let mut written = 0u64;

        for tx in records {
            if self.seen_hashes.contains(&tx.hash) {
                self.duplicates_skipped += 1;
                debug!(
                    hash = %tx.hash,
                    duplicates = self.duplicates_skipped,
                    "Skipping duplicate transaction hash"
                );
                continue;
            }
            self.seen_hashes.insert(tx.hash.clone());

            let record = TxRecord::from(tx);
            self.writer
                .serialize(&record)
                .map_err(|e| SinkError::CsvError(format!("Failed to write transaction: {e}")))?;

            self.records_written += 1;
            written += 1;

            if self.records_written % FLUSH_INTERVAL == 0 {
                self.flush()?;
                debug!("Progress: {} records written", self.records_written);
            }
        }

        debug!(index, written, "Appended ledger to sink");
        Ok(())
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> SinkResult<()> {
        self.writer
            .flush()
            .map_err(|e| SinkError::FlushError(format!("Failed to flush: {e}")))
    }

    /// Close the sink, flushing and syncing the file to disk.
    pub fn close(mut self) -> SinkResult<()> {
        debug!(
            "Closing CSV sink: {} records written, {} duplicates skipped",
            self.records_written, self.duplicates_skipped
        );

        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| SinkError::IoError(format!("Failed to get inner writer: {e}")))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| SinkError::IoError(format!("Failed to get file handle: {e}")))?;

        file.sync_all()
            .map_err(|e| SinkError::IoError(format!("Failed to sync file: {e}")))?;

        info!(
            "CSV sink closed: {} records written, {} duplicates skipped",
            self.records_written, self.duplicates_skipped
        );
        Ok(())
    }
}
