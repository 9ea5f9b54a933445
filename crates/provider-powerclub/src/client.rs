//! Powerclub REST API client with rate limiting.
//!
//! Provides the three calls a collection run needs: login, the half-hourly
//! usage fetch and logout. Requests are paced with the governor crate and
//! transient fetch failures are retried with exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use meter_ingest_core::{ApiConfig, Credentials};
//! use meter_ingest_powerclub::PowerclubClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PowerclubClient::new(ApiConfig::default())?;
//!     let session = client.login(&Credentials::new("me@example.com", "secret")).await?;
//!     for resource in session.resources() {
//!         println!("{} ({})", resource.label, resource.id);
//!     }
//!     client.logout(&session).await?;
//!     Ok(())
//! }
//! ```

use crate::backoff::Backoff;
use crate::error::{PowerclubError, Result};
use crate::types::{RawLoginResponse, RawUsageResponse};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use meter_ingest_core::{
    ApiConfig, AuthenticationError, CredentialSession, Credentials, DayFetcher, DaySeries,
    LogoutMethod, Resource, ResourceId, Session,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Day parameter format of the usage endpoint.
const START_DATE_FORMAT: &str = "%Y-%m-%d";

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Powerclub API client.
#[derive(Clone)]
pub struct PowerclubClient {
    config: ApiConfig,
    http: Client,
    rate_limiter: Arc<DirectLimiter>,
    backoff: Backoff,
}

impl std::fmt::Debug for PowerclubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerclubClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .field("logout_method", &self.config.logout_method)
            .finish_non_exhaustive()
    }
}

impl PowerclubClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built or the rate limit is zero.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PowerclubError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            PowerclubError::Configuration("requests_per_minute must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
        let backoff = Backoff::from(&config);

        Ok(Self {
            config: ApiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            http,
            rate_limiter,
            backoff,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Replaces the retry schedule.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;
        let response = request.header("Accept", "application/json").send().await?;
        Ok(response)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Logs in and returns the session token with the account's addresses.
    ///
    /// # Errors
    /// Returns [`PowerclubError::Authentication`] on any non-200 response.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let url = self.url("/user/login");
        tracing::debug!("POST {}", url);

        let form = [
            ("email", credentials.email.as_str()),
            ("password", credentials.password.expose_secret()),
        ];
        let response = self.send(self.http.post(&url).form(&form)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(PowerclubError::Authentication(format!(
                "login returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let body: RawLoginResponse = response.json().await?;
        let resources: Vec<Resource> = body.data.address.into_iter().map(Resource::from).collect();
        tracing::info!(resources = resources.len(), "Logged in");

        Ok(Session::new(body.data.auth_token, resources))
    }

    /// Ends the session using the configured verb.
    ///
    /// # Errors
    /// Returns error on a network failure or a non-success response.
    pub async fn logout(&self, session: &Session) -> Result<()> {
        let url = self.url("/user/logout");
        let request = match self.config.logout_method {
            LogoutMethod::Post => self.http.post(&url),
            LogoutMethod::Delete => self.http.delete(&url),
        };
        tracing::debug!(method = ?self.config.logout_method, "Logout {}", url);

        let response = self
            .send(request.header("Authorization", session.token().expose_secret()))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PowerclubError::api(status.as_u16(), text));
        }
        Ok(())
    }

    // =========================================================================
    // Usage
    // =========================================================================

    /// Fetches one day of half-hourly usage and spot prices, once.
    ///
    /// # Errors
    /// Returns error for an unusable resource id, a non-200 response or a
    /// body that does not decode.
    pub async fn fetch_half_hourly(
        &self,
        session: &Session,
        resource: &ResourceId,
        day: NaiveDate,
    ) -> Result<DaySeries> {
        let id = resource
            .validated()
            .map_err(|e| PowerclubError::InvalidResource(e.to_string()))?;
        let url = self.url(&format!("/usage/half-hourly/{id}"));
        let start_date = day.format(START_DATE_FORMAT).to_string();

        tracing::debug!("GET {}?start_date={}", url, start_date);

        let request = self
            .http
            .get(&url)
            .query(&[("start_date", start_date.as_str())])
            .header("Authorization", session.token().expose_secret());
        let response = self.send(request).await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(PowerclubError::rate_limit(retry_after));
        }
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(PowerclubError::api(status.as_u16(), text));
        }

        // Decode from text so shape errors surface as Decode, not Network.
        let text = response.text().await?;
        let body: RawUsageResponse = serde_json::from_str(&text)?;
        Ok(DaySeries::from(body.data))
    }

    /// Fetches one day, retrying transient failures per the backoff schedule.
    ///
    /// # Errors
    /// Returns the last error once retries are exhausted, or the first
    /// non-transient error.
    pub async fn fetch_with_retry(
        &self,
        session: &Session,
        resource: &ResourceId,
        day: NaiveDate,
    ) -> Result<DaySeries> {
        let mut retry = 0;
        loop {
            match self.fetch_half_hourly(session, resource, day).await {
                Ok(series) => return Ok(series),
                Err(e) if e.is_transient() && retry < self.backoff.max_retries => {
                    let delay = self.backoff.delay_with_hint(retry, e.retry_after());
                    tracing::warn!(
                        resource = %resource,
                        %day,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CredentialSession for PowerclubClient {
    async fn login(&self, credentials: &Credentials) -> std::result::Result<Session, AuthenticationError> {
        PowerclubClient::login(self, credentials)
            .await
            .map_err(|e| AuthenticationError(e.to_string()))
    }

    async fn logout(&self, session: &Session) {
        if let Err(e) = PowerclubClient::logout(self, session).await {
            tracing::warn!(error = %e, "Logout failed");
        }
    }
}

#[async_trait]
impl DayFetcher for PowerclubClient {
    async fn fetch(&self, session: &Session, resource: &ResourceId, day: NaiveDate) -> DaySeries {
        match self.fetch_with_retry(session, resource, day).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(resource = %resource, %day, error = %e, "Fetch failed, treating day as empty");
                DaySeries::empty()
            }
        }
    }
}
