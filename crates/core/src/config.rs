use crate::clock::SlotZone;
use crate::error::ConfigError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metering service base URL.
pub const DEFAULT_BASE_URL: &str = "https://dest-pc-signup-sandbox.herokuapp.com";

/// HTTP verb used for the logout call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutMethod {
    /// `POST /user/logout`.
    #[default]
    Post,
    /// `DELETE /user/logout`.
    Delete,
}

/// Upstream API client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Client-side request budget.
    pub requests_per_minute: u32,
    /// Retries of a transiently failing day fetch.
    pub max_retries: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on a single retry delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Verb for `/user/logout`.
    pub logout_method: LogoutMethod,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            requests_per_minute: 60,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            logout_method: LogoutMethod::Post,
        }
    }
}

impl ApiConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff_ms;
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Sets the logout verb.
    #[must_use]
    pub fn with_logout_method(mut self, method: LogoutMethod) -> Self {
        self.logout_method = method;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing { key: "api.base_url" });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("api.timeout_secs", "must be greater than 0"));
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::invalid(
                "api.requests_per_minute",
                "must be greater than 0",
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::invalid(
                "api.initial_backoff_ms",
                "must not exceed api.max_backoff_ms",
            ));
        }
        Ok(())
    }
}

/// Account credentials; supplied once, never persisted.
#[derive(Debug)]
pub struct Credentials {
    /// Account email, sent as the login form's `email` field.
    pub email: String,
    /// Account password; redacted in `Debug` output.
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Configuration as extracted from the layered providers, before validation.
#[derive(Default, Deserialize)]
pub struct RawConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub checkpoint_dir: Option<PathBuf>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
}

impl RawConfig {
    /// Validates required keys and converts into [`CollectorConfig`].
    ///
    /// # Errors
    /// Returns [`ConfigError`] naming the first missing or invalid key.
    pub fn validate(self) -> Result<CollectorConfig, ConfigError> {
        let email = non_blank(self.email).ok_or(ConfigError::Missing { key: "email" })?;
        let password = non_blank(self.password).ok_or(ConfigError::Missing { key: "password" })?;
        let checkpoint_dir = self
            .checkpoint_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing {
                key: "checkpoint_dir",
            })?;
        let zone = SlotZone::from_name(self.timezone.as_deref())?;
        self.api.validate()?;

        Ok(CollectorConfig {
            credentials: Credentials::new(email, password),
            checkpoint_dir,
            zone,
            api: self.api,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validated collector configuration.
#[derive(Debug)]
pub struct CollectorConfig {
    /// Login credentials for the metering service.
    pub credentials: Credentials,
    /// Directory holding one cursor file per resource.
    pub checkpoint_dir: PathBuf,
    /// Zone the service reports slot timestamps in.
    pub zone: SlotZone,
    /// HTTP client settings.
    pub api: ApiConfig,
}
