//! Error types shared by the collector components.
//!
//! Only configuration and authentication failures are fatal for a run.
//! Checkpoint and sink failures are I/O problems on our side; merge failures
//! halt a single resource for the current day.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key was absent or blank.
    #[error("invalid configuration: key '{key}' is missing")]
    Missing {
        /// Name of the missing key.
        key: &'static str,
    },

    /// A key was present but its value is unusable.
    #[error("invalid configuration: key '{key}': {reason}")]
    Invalid {
        /// Name of the offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The layered providers could not be merged or extracted.
    #[error("failed to load configuration: {0}")]
    Load(String),

    /// The scheduler's control envelope could not be parsed.
    #[error("failed to parse control envelope: {0}")]
    Envelope(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Login was refused or could not be completed.
#[derive(Debug, Error)]
#[error("authentication failed: {0}")]
pub struct AuthenticationError(pub String);

/// A resource identifier cannot be used as a path segment or storage key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid resource id '{id}': {reason}")]
pub struct InvalidResourceId {
    /// Identifier as received.
    pub id: String,
    /// Which rule it broke.
    pub reason: &'static str,
}

/// A checkpoint could not be persisted.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The resource identifier is not usable as a storage key.
    #[error("invalid checkpoint key: {0}")]
    InvalidKey(#[from] InvalidResourceId),

    /// Writing the cursor failed.
    #[error("failed to write checkpoint {path}")]
    Write {
        /// Target path of the write.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// The output stream rejected an operation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// `open` was called twice, or `emit`/`close` before `open`, or anything after `close`.
    #[error("event sink used out of order: {0}")]
    State(&'static str),

    /// The metrics payload could not be encoded.
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing to the underlying stream failed.
    #[error("failed to write to event stream: {0}")]
    Io(#[from] std::io::Error),
}

/// A fetched day could not be turned into events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    /// A slot carried a timestamp we cannot place on the time line.
    #[error("unparseable slot timestamp '{raw}' at index {index}")]
    Timestamp {
        /// Slot position within the day.
        index: usize,
        /// Timestamp as received.
        raw: String,
    },
}
