//! Collection run for the half-hourly meter collector.
//!
//! A run logs in once, walks every resource from its checkpoint up to
//! yesterday one day at a time, and writes each resource's cursor back when
//! its loop ends. A short or unparseable day halts only that resource; the
//! same day is fetched again on the next run.

pub mod error;
pub mod orchestrator;
pub mod report;

pub use error::{CollectorError, Result};
pub use orchestrator::Collector;
pub use report::{DayOutcome, HaltReason, ResourceReport, RunSummary};
