//! Resources, sessions and the per-day series returned by the metering service.

use crate::error::InvalidResourceId;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of half-hour slots in a complete calendar day.
pub const SLOTS_PER_DAY: usize = 48;

/// Longest identifier accepted as a storage key.
const MAX_RESOURCE_ID_LEN: usize = 128;

/// Identifier of a metered resource (an address on the upstream account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wraps a raw identifier without validating it.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier if it is safe to use as a URL path segment or file name.
    ///
    /// Valid identifiers are non-empty, at most 128 characters, and contain only
    /// ASCII alphanumerics, hyphens and underscores.
    ///
    /// # Errors
    /// Returns [`InvalidResourceId`] naming the rule that was broken.
    pub fn validated(&self) -> Result<&str, InvalidResourceId> {
        let id = self.0.as_str();
        let reject = |reason| InvalidResourceId {
            id: id.to_string(),
            reason,
        };

        if id.is_empty() {
            return Err(reject("identifier cannot be empty"));
        }
        if id.contains("..") || id.contains('/') || id.contains('\\') {
            return Err(reject("contains forbidden characters"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(reject("must contain only alphanumeric, hyphen, or underscore"));
        }
        if id.len() > MAX_RESOURCE_ID_LEN {
            return Err(reject("exceeds maximum length of 128"));
        }

        Ok(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A metered resource enumerated at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Stable identifier, used for fetches and as the checkpoint key.
    pub id: ResourceId,
    /// Human-readable label, used as the event source.
    pub label: String,
}

impl Resource {
    /// Creates a resource.
    pub fn new(id: impl Into<ResourceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// An authenticated session, valid until logout.
#[derive(Debug)]
pub struct Session {
    token: SecretString,
    resources: Vec<Resource>,
}

impl Session {
    /// Creates a session from the token and resources returned by login.
    pub fn new(token: impl Into<String>, resources: Vec<Resource>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            resources,
        }
    }

    /// Authorization token; expose only when building a request.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Resources in the order the service returned them.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

/// A reading exactly as the service sent it.
///
/// Integers stay integers and decimals keep their JSON form, so a value
/// written out is the value received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(serde_json::Number);

impl Amount {
    /// Numeric value, if representable as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self(serde_json::Number::from(0))
    }
}

impl From<serde_json::Number> for Amount {
    fn from(n: serde_json::Number) -> Self {
        Self(n)
    }
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Self(serde_json::Number::from(n))
    }
}

/// Non-finite values have no JSON form and become zero.
impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or_else(Self::default, Self)
    }
}

impl PartialEq<f64> for Amount {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One half-hour of consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSlot {
    /// Slot start as received from the service.
    pub timestamp: String,
    /// Grid power amount.
    pub power_amount: Amount,
    /// Solar amount.
    pub solar_amount: Amount,
}

/// One half-hour of spot price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSlot {
    /// Slot start as received from the service.
    pub timestamp: String,
    /// Spot price amount.
    pub spot_amount: Amount,
}

/// Usage and price series for one resource and one calendar day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DaySeries {
    /// Usage slots in service order.
    pub usage_slots: Vec<UsageSlot>,
    /// Price slots in service order.
    pub price_slots: Vec<PriceSlot>,
    /// Fixed rate applied to every price event of the day.
    pub fixed_rate: Amount,
}

impl DaySeries {
    /// A day with no data, used when a fetch fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if neither series has any slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usage_slots.is_empty() && self.price_slots.is_empty()
    }
}
