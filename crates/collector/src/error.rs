//! Errors that end a collection run.

use meter_ingest_core::{AuthenticationError, CheckpointError, SinkError};
use thiserror::Error;

/// A fatal run failure.
///
/// Incomplete or misaligned days are not errors; they show up as halted
/// resources in the [`RunSummary`](crate::RunSummary).
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Login failed; nothing was written to the sink.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// A cursor could not be persisted.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The output stream failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;
