//! Wire types of the Powerclub API.

use meter_ingest_core::{Amount, DaySeries, PriceSlot, Resource, ResourceId, UsageSlot};
use serde::Deserialize;

/// Response of `POST /user/login`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLoginResponse {
    pub data: RawUser,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUser {
    pub auth_token: String,
    #[serde(default)]
    pub address: Vec<RawAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAddress {
    pub address_id: RawId,
    pub street: Option<String>,
}

/// Address ids are numeric on the wire, but strings are accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Number(i64),
    Text(String),
}

impl From<RawId> for ResourceId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => ResourceId::new(n.to_string()),
            RawId::Text(s) => ResourceId::new(s),
        }
    }
}

impl From<RawAddress> for Resource {
    fn from(raw: RawAddress) -> Self {
        let id = ResourceId::from(raw.address_id);
        // Fall back to the id so every event still has a source.
        let label = raw.street.unwrap_or_else(|| id.to_string());
        Resource { id, label }
    }
}

/// Response of `GET /usage/half-hourly/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUsageResponse {
    pub data: RawUsageDay,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUsageDay {
    #[serde(default)]
    pub usage_data: Option<Vec<RawUsage>>,
    #[serde(default)]
    pub spot_price_data: Option<Vec<RawSpotPrice>>,
    pub fixed_rate: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUsage {
    pub date: String,
    pub amount: Amount,
    pub solar: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSpotPrice {
    pub date: String,
    pub amount: Amount,
}

impl From<RawUsageDay> for DaySeries {
    fn from(raw: RawUsageDay) -> Self {
        Self {
            usage_slots: raw
                .usage_data
                .unwrap_or_default()
                .into_iter()
                .map(|u| UsageSlot {
                    timestamp: u.date,
                    power_amount: u.amount,
                    solar_amount: u.solar,
                })
                .collect(),
            price_slots: raw
                .spot_price_data
                .unwrap_or_default()
                .into_iter()
                .map(|p| PriceSlot {
                    timestamp: p.date,
                    spot_amount: p.amount,
                })
                .collect(),
            fixed_rate: raw.fixed_rate,
        }
    }
}
