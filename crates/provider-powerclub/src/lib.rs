//! Powerclub metering API integration.
//!
//! This crate provides:
//! - A rate-limited REST client for login, logout and half-hourly usage
//! - Exponential backoff for transient fetch failures
//! - The [`CredentialSession`](meter_ingest_core::CredentialSession) and
//!   [`DayFetcher`](meter_ingest_core::DayFetcher) implementations used by the collector

pub mod backoff;
pub mod client;
pub mod error;
mod types;

pub use backoff::Backoff;
pub use client::PowerclubClient;
pub use error::{PowerclubError, Result};
