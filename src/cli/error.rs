//! CLI error types and conversions

use crate::ingest::IngestError;
use crate::sink::SinkError;

/// CLI errors.
///
/// Argument validation happens in clap value parsers before `execute`
/// runs, so only pipeline failures surface here.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Ingest error
    #[error("ingest error: {0}")]
    IngestError(#[from] IngestError),

    /// Sink error
    #[error("sink error: {0}")]
    SinkError(#[from] SinkError),
}
