//! Calendar and time-zone handling.
//!
//! The service reports slot starts as wall-clock strings without an offset,
//! so both "today" and epoch conversion depend on the zone the account lives
//! in. When no zone is configured the host's local zone is used.

use crate::error::ConfigError;
use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Wall-clock format of slot timestamps.
const SLOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Zone used to interpret wall-clock slot timestamps and to decide "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotZone {
    /// The host's local zone.
    #[default]
    Local,
    /// A named IANA zone.
    Named(Tz),
}

impl SlotZone {
    /// Parses an optional IANA zone name; `None` selects the host zone.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an unknown zone name.
    pub fn from_name(name: Option<&str>) -> Result<Self, ConfigError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(Self::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|_| ConfigError::invalid("timezone", format!("unknown zone '{name}'"))),
        }
    }

    /// Calendar date of `now` in this zone.
    #[must_use]
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => now.with_timezone(&Local).date_naive(),
            Self::Named(tz) => now.with_timezone(tz).date_naive(),
        }
    }

    /// Converts a slot timestamp to epoch seconds.
    ///
    /// RFC 3339 strings keep their own offset; bare wall-clock strings are
    /// placed in this zone. Returns `None` if the string is neither.
    #[must_use]
    pub fn to_epoch(&self, raw: &str) -> Option<i64> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.timestamp());
        }

        let naive = NaiveDateTime::parse_from_str(raw, SLOT_TIMESTAMP_FORMAT).ok()?;
        match self {
            Self::Local => localize(&Local, naive),
            Self::Named(tz) => localize(tz, naive),
        }
    }
}

/// Places a wall-clock time in `tz`.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times that
/// do not exist (clocks going forward) use the offset in force before the
/// transition.
fn localize<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> Option<i64> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp()),
        LocalResult::None => tz
            .from_local_datetime(&(naive - Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp() + 3600),
    }
}

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    /// Today's date; the collector fetches strictly earlier days.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in a given zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: SlotZone,
}

impl SystemClock {
    /// Creates a clock reporting dates in `zone`.
    #[must_use]
    pub fn new(zone: SlotZone) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        self.zone.date_of(Utc::now())
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
