//! Per-resource and per-run outcomes.

use chrono::NaiveDate;
use meter_ingest_core::{IncompleteReason, InvalidResourceId, MergeError, ResourceId};

/// Result of processing one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// The day was merged and emitted; the cursor moves on.
    Advanced {
        /// Events written for the day.
        events: usize,
    },
    /// Stop this resource; the same day is retried next run.
    Halted(HaltReason),
}

/// Why a resource stopped before reaching today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The fetched day was empty or short.
    Incomplete(IncompleteReason),
    /// A slot timestamp could not be placed.
    Misaligned(MergeError),
    /// The resource id is unusable as a checkpoint key; nothing was fetched.
    InvalidResource(InvalidResourceId),
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete(reason) => write!(f, "incomplete data: {reason}"),
            Self::Misaligned(err) => write!(f, "{err}"),
            Self::InvalidResource(err) => write!(f, "{err}"),
        }
    }
}

/// What happened to one resource during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    pub resource_id: ResourceId,
    pub label: String,
    /// Cursor read at the start; `None` if the resource was skipped.
    pub start: Option<NaiveDate>,
    /// Cursor written at the end; `None` if the resource was skipped.
    pub end: Option<NaiveDate>,
    pub days_advanced: u32,
    pub events_emitted: usize,
    pub halted: Option<HaltReason>,
}

impl ResourceReport {
    /// Returns true if the resource reached today.
    #[must_use]
    pub fn caught_up(&self) -> bool {
        self.halted.is_none()
    }
}

/// Aggregate of a run, in resource order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<ResourceReport>,
}

impl RunSummary {
    /// Events written across all resources.
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.reports.iter().map(|r| r.events_emitted).sum()
    }

    /// Days advanced across all resources.
    #[must_use]
    pub fn total_days(&self) -> u32 {
        self.reports.iter().map(|r| r.days_advanced).sum()
    }

    /// Resources that stopped short of today.
    pub fn halted(&self) -> impl Iterator<Item = &ResourceReport> {
        self.reports.iter().filter(|r| !r.caught_up())
    }

    /// Report for one resource.
    #[must_use]
    pub fn report(&self, resource: &ResourceId) -> Option<&ResourceReport> {
        self.reports.iter().find(|r| &r.resource_id == resource)
    }
}
