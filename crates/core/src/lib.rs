//! Core types and rules for the half-hourly meter collector.
//!
//! This crate provides:
//! - The data model: resources, sessions, day series and merged events
//! - Component traits: credential session, day fetcher, checkpoint store, event sink
//! - The day validator and the event merger
//! - Typed configuration loaded through `figment`

pub mod clock;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod merge;
pub mod traits;
pub mod types;
pub mod validation;

pub use clock::{Clock, FixedClock, SlotZone, SystemClock};
pub use config::{ApiConfig, CollectorConfig, Credentials, LogoutMethod, RawConfig, DEFAULT_BASE_URL};
pub use config_loader::{ConfigLoader, ConfigOverrides, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use error::{
    AuthenticationError, CheckpointError, ConfigError, InvalidResourceId, MergeError, SinkError,
};
pub use events::{MergedEvent, Metric};
pub use merge::EventMerger;
pub use traits::{CheckpointStore, CredentialSession, DayFetcher, EventSink};
pub use types::{Amount, DaySeries, PriceSlot, Resource, ResourceId, Session, UsageSlot, SLOTS_PER_DAY};
pub use validation::{DayValidator, DayVerdict, IncompleteReason};
