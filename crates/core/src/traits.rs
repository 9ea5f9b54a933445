use crate::config::Credentials;
use crate::error::{AuthenticationError, CheckpointError, SinkError};
use crate::events::MergedEvent;
use crate::types::{DaySeries, ResourceId, Session};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};

/// Login and logout against the metering service.
#[async_trait]
pub trait CredentialSession: Send + Sync {
    /// Authenticates once for the run.
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthenticationError>;

    /// Best-effort teardown; failures are logged, never returned.
    async fn logout(&self, session: &Session);
}

/// Retrieves one resource's data for one calendar day.
#[async_trait]
pub trait DayFetcher: Send + Sync {
    /// Fetches `day` for `resource`. Failures come back as an empty series.
    async fn fetch(&self, session: &Session, resource: &ResourceId, day: NaiveDate) -> DaySeries;
}

/// Durable per-resource cursor: the first day not yet fully merged.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Stored cursor, or `None` if absent or unreadable.
    async fn load(&self, resource: &ResourceId) -> Option<NaiveDate>;

    /// Overwrites the stored cursor.
    async fn write(&self, resource: &ResourceId, cursor: NaiveDate) -> Result<(), CheckpointError>;

    /// Stored cursor, defaulting to the day before `today`.
    async fn read(&self, resource: &ResourceId, today: NaiveDate) -> NaiveDate {
        match self.load(resource).await {
            Some(cursor) => cursor,
            None => today.checked_sub_days(Days::new(1)).unwrap_or(today),
        }
    }
}

/// Append-only output stream framed by a single open/close pair.
pub trait EventSink: Send {
    /// Writes the stream-start marker.
    fn open(&mut self) -> Result<(), SinkError>;

    /// Writes and flushes one event.
    fn emit(&mut self, event: &MergedEvent) -> Result<(), SinkError>;

    /// Writes the stream-end marker.
    fn close(&mut self) -> Result<(), SinkError>;
}
