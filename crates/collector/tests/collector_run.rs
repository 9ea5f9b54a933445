//! End-to-end collection runs against in-memory adapters.

use async_trait::async_trait;
use chrono::NaiveDate;
use meter_ingest_collector::{Collector, CollectorError, HaltReason};
use meter_ingest_core::{
    AuthenticationError, CheckpointStore, CredentialSession, Credentials, DayFetcher, DaySeries,
    EventSink, FixedClock, IncompleteReason, MergedEvent, Metric, PriceSlot, Resource, ResourceId,
    Session, SinkError, SlotZone, UsageSlot,
};
use meter_ingest_data::{MemoryCheckpointStore, MemorySink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Clone, Default)]
struct FakeSession {
    resources: Vec<Resource>,
    reject: bool,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeSession {
    fn with(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }

    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CredentialSession for FakeSession {
    async fn login(&self, _credentials: &Credentials) -> Result<Session, AuthenticationError> {
        self.calls.lock().push("login");
        if self.reject {
            return Err(AuthenticationError("login returned 401".to_string()));
        }
        Ok(Session::new("tok", self.resources.clone()))
    }

    async fn logout(&self, _session: &Session) {
        self.calls.lock().push("logout");
    }
}

/// Serves canned days; anything not configured comes back empty.
#[derive(Clone, Default)]
struct FakeFetcher {
    days: Arc<Mutex<HashMap<(ResourceId, NaiveDate), DaySeries>>>,
    requests: Arc<Mutex<Vec<(ResourceId, NaiveDate)>>>,
}

impl FakeFetcher {
    fn serve(&self, resource: &str, day: NaiveDate, series: DaySeries) {
        self.days.lock().insert((ResourceId::from(resource), day), series);
    }

    fn requests(&self) -> Vec<(ResourceId, NaiveDate)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DayFetcher for FakeFetcher {
    async fn fetch(&self, _session: &Session, resource: &ResourceId, day: NaiveDate) -> DaySeries {
        self.requests.lock().push((resource.clone(), day));
        self.days
            .lock()
            .get(&(resource.clone(), day))
            .cloned()
            .unwrap_or_default()
    }
}

/// Sink that accepts `fail_after` events, then fails every write.
#[derive(Default)]
struct BrokenSink {
    opened: bool,
    fail_after: usize,
    emitted: usize,
}

impl BrokenSink {
    fn failing_after(fail_after: usize) -> Self {
        Self {
            fail_after,
            ..Self::default()
        }
    }
}

impl EventSink for BrokenSink {
    fn open(&mut self) -> Result<(), SinkError> {
        self.opened = true;
        Ok(())
    }

    fn emit(&mut self, _event: &MergedEvent) -> Result<(), SinkError> {
        if self.emitted >= self.fail_after {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "consumer went away",
            )));
        }
        self.emitted += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn utc() -> SlotZone {
    SlotZone::from_name(Some("UTC")).unwrap()
}

fn slot_time(day: NaiveDate, i: usize) -> String {
    format!("{}T{:02}:{:02}:00", day.format("%Y-%m-%d"), i / 2, (i % 2) * 30)
}

fn full_day(day: NaiveDate) -> DaySeries {
    DaySeries {
        usage_slots: (0..48)
            .map(|i| UsageSlot {
                timestamp: slot_time(day, i),
                power_amount: 0.5.into(),
                solar_amount: 0.0.into(),
            })
            .collect(),
        price_slots: (0..48)
            .map(|i| PriceSlot {
                timestamp: slot_time(day, i),
                spot_amount: 0.125.into(),
            })
            .collect(),
        fixed_rate: 0.25.into(),
    }
}

fn short_day(day: NaiveDate, usage: usize) -> DaySeries {
    let mut series = full_day(day);
    series.usage_slots.truncate(usage);
    series
}

fn main_st() -> Resource {
    Resource::new("42", "1 Main St")
}

fn credentials() -> Credentials {
    Credentials::new("ops@example.com", "hunter2")
}

fn collector(
    session: &FakeSession,
    fetcher: &FakeFetcher,
    store: &Arc<MemoryCheckpointStore>,
    today: NaiveDate,
) -> Collector<FakeSession, FakeFetcher> {
    Collector::new(
        session.clone(),
        fetcher.clone(),
        store.clone(),
        Arc::new(FixedClock(today)),
        utc(),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_worked_example_advances_then_halts() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    fetcher.serve("42", date(2024, 1, 2), short_day(date(2024, 1, 2), 10));
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 3))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.events.len(), 48);
    assert!(sink.events.iter().all(|e| e.source == "1 Main St"));
    assert!(sink.events.iter().all(|e| e.metrics().len() == 4));
    assert_eq!(sink.events[0].timestamp, 1_704_067_200);
    assert_eq!(sink.events[0].metric(Metric::FixedPrice), Some(0.25));

    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 2)));
    assert_eq!(store.writes().len(), 1);

    let report = summary.report(&ResourceId::from("42")).unwrap();
    assert_eq!(report.start, Some(date(2024, 1, 1)));
    assert_eq!(report.end, Some(date(2024, 1, 2)));
    assert_eq!(report.days_advanced, 1);
    assert_eq!(report.events_emitted, 48);
    assert_eq!(
        report.halted,
        Some(HaltReason::Incomplete(IncompleteReason::UsageCount { found: 10 }))
    );
}

#[tokio::test]
async fn test_complete_days_advance_cursor_to_today() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    for d in 1..=4 {
        fetcher.serve("42", date(2024, 1, d), full_day(date(2024, 1, d)));
    }
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 5))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 5)));
    assert_eq!(sink.events.len(), 4 * 48);
    assert_eq!(summary.total_days(), 4);
    assert_eq!(
        fetcher.requests(),
        (1..=4)
            .map(|d| (ResourceId::from("42"), date(2024, 1, d)))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_empty_day_emits_nothing_and_keeps_cursor() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 3))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(sink.events.is_empty());
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 1)));
    assert_eq!(fetcher.requests().len(), 1);
    assert_eq!(summary.halted().count(), 1);
}

#[tokio::test]
async fn test_short_price_series_halts() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    let mut series = full_day(date(2024, 1, 1));
    series.price_slots.pop();
    fetcher.serve("42", date(2024, 1, 1), series);
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(sink.events.is_empty());
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 1)));
    assert_eq!(
        summary.reports[0].halted,
        Some(HaltReason::Incomplete(IncompleteReason::PriceCount { found: 47 }))
    );
}

#[tokio::test]
async fn test_missing_checkpoint_defaults_to_yesterday() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 3, 9), full_day(date(2024, 3, 9)));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut sink = MemorySink::new();
    collector(&session, &fetcher, &store, date(2024, 3, 10))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert_eq!(fetcher.requests(), vec![(ResourceId::from("42"), date(2024, 3, 9))]);
    assert_eq!(sink.events.len(), 48);
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 3, 10)));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    fetcher.serve("42", date(2024, 1, 2), full_day(date(2024, 1, 2)));
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));
    let collector = collector(&session, &fetcher, &store, date(2024, 1, 3));

    let mut first = MemorySink::new();
    collector.run(&credentials(), &mut first).await.unwrap();
    assert_eq!(first.events.len(), 96);

    let mut second = MemorySink::new();
    let summary = collector.run(&credentials(), &mut second).await.unwrap();
    assert!(second.events.is_empty());
    assert_eq!((second.opened, second.closed), (1, 1));
    assert_eq!(summary.total_events(), 0);
    assert_eq!(fetcher.requests().len(), 2);
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 3)));
}

#[tokio::test]
async fn test_future_cursor_is_written_back_unchanged() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 2, 1)));

    let mut sink = MemorySink::new();
    collector(&session, &fetcher, &store, date(2024, 1, 15))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(fetcher.requests().is_empty());
    assert_eq!(store.writes(), vec![(ResourceId::from("42"), date(2024, 2, 1))]);
}

#[tokio::test]
async fn test_mismatched_slot_splits_into_two_events() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    let mut series = full_day(date(2024, 1, 1));
    series.price_slots[5].timestamp = "2024-01-01T02:45:00".to_string();
    fetcher.serve("42", date(2024, 1, 1), series);
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.events.len(), 49);
    let usage_only = &sink.events[5];
    let price_only = &sink.events[6];
    assert_eq!(usage_only.metrics().len(), 2);
    assert_eq!(usage_only.metric(Metric::Power), Some(0.5));
    assert_eq!(usage_only.metric(Metric::SpotPrice), None);
    assert_eq!(price_only.metrics().len(), 2);
    assert_eq!(price_only.metric(Metric::SpotPrice), Some(0.125));
    assert_eq!(price_only.metric(Metric::Power), None);
}

#[tokio::test]
async fn test_unparseable_timestamp_halts_without_events() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    let mut series = full_day(date(2024, 1, 1));
    series.usage_slots[47].timestamp = "not a time".to_string();
    fetcher.serve("42", date(2024, 1, 1), series);
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(sink.events.is_empty());
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 1)));
    assert!(matches!(
        summary.reports[0].halted,
        Some(HaltReason::Misaligned(_))
    ));
}

#[tokio::test]
async fn test_halt_on_one_resource_does_not_affect_others() {
    let session = FakeSession::with(vec![main_st(), Resource::new("7", "Unit 7")]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("7", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    let store = Arc::new(
        MemoryCheckpointStore::new()
            .with_cursor("42", date(2024, 1, 1))
            .with_cursor("7", date(2024, 1, 1)),
    );

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.events.len(), 48);
    assert!(sink.events.iter().all(|e| e.source == "Unit 7"));
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 1)));
    assert_eq!(store.get(&ResourceId::from("7")), Some(date(2024, 1, 2)));
    assert_eq!(summary.reports[0].resource_id, ResourceId::from("42"));
    assert_eq!(summary.reports[1].resource_id, ResourceId::from("7"));
}

#[tokio::test]
async fn test_invalid_resource_is_skipped() {
    let session = FakeSession::with(vec![Resource::new("../etc", "Bad"), main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(matches!(
        summary.reports[0].halted,
        Some(HaltReason::InvalidResource(_))
    ));
    assert_eq!(summary.reports[0].end, None);
    assert_eq!(sink.events.len(), 48);
    assert_eq!(store.writes(), vec![(ResourceId::from("42"), date(2024, 1, 2))]);
}

#[tokio::test]
async fn test_login_failure_opens_nothing() {
    let session = FakeSession::rejecting();
    let fetcher = FakeFetcher::default();
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut sink = MemorySink::new();
    let err = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Authentication(_)));
    assert_eq!((sink.opened, sink.closed), (0, 0));
    assert_eq!(session.calls(), vec!["login"]);
    assert!(fetcher.requests().is_empty());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_stream_framed_and_logout_last() {
    let session = FakeSession::with(vec![]);
    let fetcher = FakeFetcher::default();
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut sink = MemorySink::new();
    let summary = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap();

    assert!(summary.reports.is_empty());
    assert_eq!((sink.opened, sink.closed), (1, 1));
    assert_eq!(session.calls(), vec!["login", "logout"]);
}

#[tokio::test]
async fn test_sink_failure_still_logs_out() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    let mut sink = BrokenSink::default();
    let err = collector(&session, &fetcher, &store, date(2024, 1, 2))
        .run(&credentials(), &mut sink)
        .await
        .unwrap_err();

    assert!(sink.opened);
    assert!(matches!(err, CollectorError::Sink(_)));
    assert_eq!(session.calls(), vec!["login", "logout"]);
    assert_eq!(store.writes(), vec![(ResourceId::from("42"), date(2024, 1, 1))]);
}

#[tokio::test]
async fn test_sink_failure_keeps_days_already_written() {
    let session = FakeSession::with(vec![main_st()]);
    let fetcher = FakeFetcher::default();
    fetcher.serve("42", date(2024, 1, 1), full_day(date(2024, 1, 1)));
    fetcher.serve("42", date(2024, 1, 2), full_day(date(2024, 1, 2)));
    let store = Arc::new(MemoryCheckpointStore::new().with_cursor("42", date(2024, 1, 1)));

    // First day goes through, second day breaks part way.
    let mut sink = BrokenSink::failing_after(50);
    let err = collector(&session, &fetcher, &store, date(2024, 1, 3))
        .run(&credentials(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectorError::Sink(_)));
    assert_eq!(sink.emitted, 50);
    assert_eq!(store.writes(), vec![(ResourceId::from("42"), date(2024, 1, 2))]);
    assert_eq!(store.get(&ResourceId::from("42")), Some(date(2024, 1, 2)));
    assert_eq!(session.calls(), vec!["login", "logout"]);
}

#[tokio::test]
async fn test_checkpoint_read_default_via_trait() {
    let store = MemoryCheckpointStore::new();
    assert_eq!(
        store.read(&ResourceId::from("42"), date(2024, 1, 1)).await,
        date(2023, 12, 31)
    );
}
