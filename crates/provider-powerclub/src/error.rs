//! Error types for the Powerclub API client.
//!
//! Login failures are fatal for a run; every other error is absorbed by the
//! day fetcher and surfaces as an incomplete day.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to Powerclub.
#[derive(Debug, Error)]
pub enum PowerclubError {
    /// Login was rejected.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// API request returned a non-success status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body, if any.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Client could not be built from the given settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Resource identifier is not usable in a request path.
    #[error("invalid resource: {0}")]
    InvalidResource(String),
}

impl PowerclubError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the request should be retried later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Delay requested by the server, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PowerclubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PowerclubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for Powerclub operations.
pub type Result<T> = std::result::Result<T, PowerclubError>;
