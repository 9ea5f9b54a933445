//! Aligns a day's usage and price series into metric events.
//!
//! Slots are paired by position, not joined by timestamp. When the paired
//! timestamps agree one event carries all four metrics; when they differ the
//! pair is split into a usage event and a price event so a price is never
//! attached to the wrong usage sample.

use crate::clock::SlotZone;
use crate::error::MergeError;
use crate::events::MergedEvent;
use crate::types::DaySeries;

/// Builds merged events from validated days.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventMerger {
    zone: SlotZone,
}

impl EventMerger {
    /// Creates a merger that places wall-clock timestamps in `zone`.
    #[must_use]
    pub fn new(zone: SlotZone) -> Self {
        Self { zone }
    }

    /// Merges one day for the resource labelled `source`.
    ///
    /// Events come out in slot order; a split pair yields the usage event
    /// before the price event. Extra slots in the longer series are ignored.
    ///
    /// # Errors
    /// Returns [`MergeError::Timestamp`] if any paired slot has a timestamp
    /// that cannot be converted. No events are returned in that case.
    pub fn merge(&self, day: &DaySeries, source: &str) -> Result<Vec<MergedEvent>, MergeError> {
        let mut events = Vec::with_capacity(day.usage_slots.len());

        for (index, (usage, price)) in day.usage_slots.iter().zip(&day.price_slots).enumerate() {
            let usage_ts = self.epoch(index, &usage.timestamp)?;
            let price_ts = self.epoch(index, &price.timestamp)?;

            if usage_ts == price_ts {
                events.push(MergedEvent::combined(
                    usage_ts,
                    source,
                    usage.power_amount.clone(),
                    usage.solar_amount.clone(),
                    price.spot_amount.clone(),
                    day.fixed_rate.clone(),
                ));
            } else {
                tracing::debug!(
                    index,
                    usage = %usage.timestamp,
                    price = %price.timestamp,
                    "Slot timestamps differ, emitting separate events"
                );
                events.push(MergedEvent::usage(
                    usage_ts,
                    source,
                    usage.power_amount.clone(),
                    usage.solar_amount.clone(),
                ));
                events.push(MergedEvent::price(
                    price_ts,
                    source,
                    price.spot_amount.clone(),
                    day.fixed_rate.clone(),
                ));
            }
        }

        Ok(events)
    }

    fn epoch(&self, index: usize, raw: &str) -> Result<i64, MergeError> {
        self.zone.to_epoch(raw).ok_or_else(|| MergeError::Timestamp {
            index,
            raw: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Metric;
    use crate::types::{PriceSlot, UsageSlot};

    const JAN_1_UTC: i64 = 1_704_067_200;

    fn merger() -> EventMerger {
        EventMerger::new(SlotZone::Named(chrono_tz::UTC))
    }

    fn slot_time(i: usize) -> String {
        format!("2024-01-01T{:02}:{:02}:00", i / 2, (i % 2) * 30)
    }

    fn aligned_day() -> DaySeries {
        DaySeries {
            usage_slots: (0..48)
                .map(|i| UsageSlot {
                    timestamp: slot_time(i),
                    power_amount: (i as f64).into(),
                    solar_amount: 0.5.into(),
                })
                .collect(),
            price_slots: (0..48)
                .map(|i| PriceSlot {
                    timestamp: slot_time(i),
                    spot_amount: (0.1 * i as f64).into(),
                })
                .collect(),
            fixed_rate: 0.25.into(),
        }
    }

    #[test]
    fn test_aligned_day_yields_one_event_per_slot() {
        let events = merger().merge(&aligned_day(), "1 Main St").unwrap();

        assert_eq!(events.len(), 48);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.timestamp, JAN_1_UTC + 1800 * i as i64);
            assert_eq!(event.source, "1 Main St");
            assert_eq!(event.metrics().len(), 4);
            assert_eq!(event.metric(Metric::Power), Some(i as f64));
            assert_eq!(event.metric(Metric::FixedPrice), Some(0.25));
        }
    }

    #[test]
    fn test_single_mismatch_splits_that_slot() {
        let mut day = aligned_day();
        day.price_slots[5].timestamp = "2024-01-01T02:45:00".to_string();

        let events = merger().merge(&day, "src").unwrap();
        assert_eq!(events.len(), 49);

        let usage = &events[5];
        assert_eq!(usage.timestamp, JAN_1_UTC + 1800 * 5);
        assert_eq!(usage.metrics().len(), 2);
        assert_eq!(usage.metric(Metric::Power), Some(5.0));
        assert_eq!(usage.metric(Metric::SpotPrice), None);

        let price = &events[6];
        assert_eq!(price.timestamp, JAN_1_UTC + 2 * 3600 + 45 * 60);
        assert_eq!(price.metrics().len(), 2);
        assert_eq!(price.metric(Metric::FixedPrice), Some(0.25));
        assert_eq!(price.metric(Metric::Solar), None);

        // Neighbours stay merged.
        assert_eq!(events[4].metrics().len(), 4);
        assert_eq!(events[7].metrics().len(), 4);
    }

    #[test]
    fn test_swapped_slots_are_split_not_rejoined() {
        let mut day = aligned_day();
        day.price_slots.swap(0, 1);

        let events = merger().merge(&day, "src").unwrap();
        assert_eq!(events.len(), 50);
        assert_eq!(events[1].timestamp, JAN_1_UTC + 1800);
        assert_eq!(events[1].metric(Metric::SpotPrice), Some(0.1));
    }

    #[test]
    fn test_equal_instants_in_different_notation_merge() {
        let mut day = aligned_day();
        day.price_slots[0].timestamp = "2024-01-01T00:00:00+00:00".to_string();

        let events = merger().merge(&day, "src").unwrap();
        assert_eq!(events.len(), 48);
    }

    #[test]
    fn test_values_pass_through_unmodified() {
        let mut day = aligned_day();
        day.usage_slots[0].power_amount = 1.234_567_89.into();
        day.price_slots[0].spot_amount = (-0.0042).into();

        let events = merger().merge(&day, "src").unwrap();
        assert_eq!(events[0].metric(Metric::Power), Some(1.234_567_89));
        assert_eq!(events[0].metric(Metric::SpotPrice), Some(-0.0042));
    }

    #[test]
    fn test_bad_timestamp_fails_whole_day() {
        let mut day = aligned_day();
        day.usage_slots[10].timestamp = "garbage".to_string();

        let err = merger().merge(&day, "src").unwrap_err();
        assert_eq!(
            err,
            MergeError::Timestamp {
                index: 10,
                raw: "garbage".to_string()
            }
        );
    }
}
