//! Merged metric events, the unit of collector output.

use crate::types::Amount;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Metric carried by a merged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Grid power from the usage series.
    Power,
    /// Solar from the usage series.
    Solar,
    /// Spot price from the price series.
    SpotPrice,
    /// The day's fixed rate.
    FixedPrice,
}

impl Metric {
    /// Name of the metric in the output payload.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Power => "metric_name:power",
            Metric::Solar => "metric_name:solar",
            Metric::SpotPrice => "metric_name:spotprice",
            Metric::FixedPrice => "metric_name:fixedprice",
        }
    }
}

/// A timestamped set of metrics for one source.
///
/// Metrics keep their insertion order, which is also their order in the
/// serialized payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEvent {
    /// Slot start in epoch seconds.
    pub timestamp: i64,
    /// Resource label.
    pub source: String,
    metrics: Vec<(Metric, Amount)>,
}

impl MergedEvent {
    /// Usage and price for the same slot.
    pub fn combined(
        timestamp: i64,
        source: impl Into<String>,
        power: impl Into<Amount>,
        solar: impl Into<Amount>,
        spot_price: impl Into<Amount>,
        fixed_rate: impl Into<Amount>,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            metrics: vec![
                (Metric::Power, power.into()),
                (Metric::Solar, solar.into()),
                (Metric::SpotPrice, spot_price.into()),
                (Metric::FixedPrice, fixed_rate.into()),
            ],
        }
    }

    /// Usage half of a slot whose price timestamp did not line up.
    pub fn usage(
        timestamp: i64,
        source: impl Into<String>,
        power: impl Into<Amount>,
        solar: impl Into<Amount>,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            metrics: vec![(Metric::Power, power.into()), (Metric::Solar, solar.into())],
        }
    }

    /// Price half of a slot whose usage timestamp did not line up.
    pub fn price(
        timestamp: i64,
        source: impl Into<String>,
        spot_price: impl Into<Amount>,
        fixed_rate: impl Into<Amount>,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            metrics: vec![
                (Metric::SpotPrice, spot_price.into()),
                (Metric::FixedPrice, fixed_rate.into()),
            ],
        }
    }

    /// Metrics in payload order.
    #[must_use]
    pub fn metrics(&self) -> &[(Metric, Amount)] {
        &self.metrics
    }

    /// Value of a single metric, if present.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(m, _)| *m == metric)
            .and_then(|(_, v)| v.as_f64())
    }

    /// Compact JSON object of metric name to value, e.g.
    /// `{"metric_name:power":0.5,"metric_name:solar":0.0}`.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&MetricPayload(&self.metrics))
    }
}

struct MetricPayload<'a>(&'a [(Metric, Amount)]);

impl Serialize for MetricPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (metric, value) in self.0 {
            map.serialize_entry(metric.as_str(), value)?;
        }
        map.end()
    }
}
