//! Completeness check for a fetched day.
//!
//! A day is merged only when both series carry exactly one slot per half
//! hour. Anything else halts the resource without emitting events for that
//! day; the same day is retried on the next run.

use crate::types::{DaySeries, SLOTS_PER_DAY};
use std::fmt;

/// Why a day was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// Usage series had the wrong number of slots.
    UsageCount {
        /// Slots received.
        found: usize,
    },
    /// Price series had the wrong number of slots.
    PriceCount {
        /// Slots received.
        found: usize,
    },
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsageCount { found } => write!(f, "usage series has {found} slots"),
            Self::PriceCount { found } => write!(f, "price series has {found} slots"),
        }
    }
}

/// Outcome of validating a fetched day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayVerdict {
    /// Both series complete; safe to merge and advance.
    Complete,
    /// Stop processing this resource for the current run.
    Incomplete(IncompleteReason),
}

/// Validates per-day cardinality.
#[derive(Debug, Clone, Copy)]
pub struct DayValidator {
    expected_slots: usize,
}

impl Default for DayValidator {
    fn default() -> Self {
        Self {
            expected_slots: SLOTS_PER_DAY,
        }
    }
}

impl DayValidator {
    /// Creates a validator expecting [`SLOTS_PER_DAY`] slots per series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots each series must contain.
    #[must_use]
    pub fn expected_slots(&self) -> usize {
        self.expected_slots
    }

    /// Checks a fetched day.
    #[must_use]
    pub fn check(&self, day: &DaySeries) -> DayVerdict {
        let usage = day.usage_slots.len();
        if usage != self.expected_slots {
            return DayVerdict::Incomplete(IncompleteReason::UsageCount { found: usage });
        }

        let price = day.price_slots.len();
        if price != self.expected_slots {
            return DayVerdict::Incomplete(IncompleteReason::PriceCount { found: price });
        }

        DayVerdict::Complete
    }

    /// Returns true if the day may be merged.
    #[must_use]
    pub fn is_complete(&self, day: &DaySeries) -> bool {
        self.check(day) == DayVerdict::Complete
    }
}
