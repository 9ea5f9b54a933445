use crate::error::Result;
use crate::report::{DayOutcome, HaltReason, ResourceReport, RunSummary};
use chrono::NaiveDate;
use meter_ingest_core::{
    CheckpointStore, Clock, CredentialSession, Credentials, DayFetcher, DayValidator, DayVerdict,
    EventMerger, EventSink, Resource, Session, SlotZone,
};
use std::sync::Arc;

/// Drives one collection run: login, every resource's day loop, logout.
pub struct Collector<S, F>
where
    S: CredentialSession,
    F: DayFetcher,
{
    session: S,
    fetcher: F,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    validator: DayValidator,
    merger: EventMerger,
}

impl<S, F> Collector<S, F>
where
    S: CredentialSession,
    F: DayFetcher,
{
    pub fn new(
        session: S,
        fetcher: F,
        checkpoints: Arc<dyn CheckpointStore>,
        clock: Arc<dyn Clock>,
        zone: SlotZone,
    ) -> Self {
        Self {
            session,
            fetcher,
            checkpoints,
            clock,
            validator: DayValidator::new(),
            merger: EventMerger::new(zone),
        }
    }

    /// Runs a full collection.
    ///
    /// The sink is opened only after login succeeds. Logout runs whenever
    /// login did, even if a later step failed.
    ///
    /// # Errors
    /// Returns [`CollectorError`](crate::CollectorError) on login failure, a
    /// checkpoint write failure, or a sink failure.
    pub async fn run(
        &self,
        credentials: &Credentials,
        sink: &mut dyn EventSink,
    ) -> Result<RunSummary> {
        let session = self.session.login(credentials).await?;
        tracing::info!(resources = session.resources().len(), "Session established");

        let result = self.collect_all(&session, sink).await;

        self.session.logout(&session).await;
        result
    }

    async fn collect_all(&self, session: &Session, sink: &mut dyn EventSink) -> Result<RunSummary> {
        sink.open()?;

        let today = self.clock.today();
        let mut summary = RunSummary::default();

        for resource in session.resources() {
            let report = self.collect_resource(session, resource, today, sink).await?;
            summary.reports.push(report);
        }

        sink.close()?;

        tracing::info!(
            resources = summary.reports.len(),
            days = summary.total_days(),
            events = summary.total_events(),
            halted = summary.halted().count(),
            "Run complete"
        );
        Ok(summary)
    }

    async fn collect_resource(
        &self,
        session: &Session,
        resource: &Resource,
        today: NaiveDate,
        sink: &mut dyn EventSink,
    ) -> Result<ResourceReport> {
        if let Err(e) = resource.id.validated() {
            tracing::warn!(resource = %resource.id, label = %resource.label, error = %e, "Skipping resource");
            return Ok(ResourceReport {
                resource_id: resource.id.clone(),
                label: resource.label.clone(),
                start: None,
                end: None,
                days_advanced: 0,
                events_emitted: 0,
                halted: Some(HaltReason::InvalidResource(e)),
            });
        }

        let start = self.checkpoints.read(&resource.id, today).await;
        let mut cursor = start;
        let mut days_advanced = 0;
        let mut events_emitted = 0;
        let mut halted = None;
        let mut failure = None;

        while cursor < today {
            let outcome = match self.process_day(session, resource, cursor, sink).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            match outcome {
                DayOutcome::Advanced { events } => {
                    days_advanced += 1;
                    events_emitted += events;
                    match cursor.succ_opt() {
                        Some(next) => cursor = next,
                        None => break,
                    }
                }
                DayOutcome::Halted(reason) => {
                    tracing::info!(
                        resource = %resource.id,
                        label = %resource.label,
                        day = %cursor,
                        %reason,
                        "Halting resource"
                    );
                    halted = Some(reason);
                    break;
                }
            }
        }

        // Days before the cursor were fully emitted, even when a later one failed.
        self.checkpoints.write(&resource.id, cursor).await?;
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(ResourceReport {
            resource_id: resource.id.clone(),
            label: resource.label.clone(),
            start: Some(start),
            end: Some(cursor),
            days_advanced,
            events_emitted,
            halted,
        })
    }

    /// Fetches, validates, merges and emits one day.
    async fn process_day(
        &self,
        session: &Session,
        resource: &Resource,
        day: NaiveDate,
        sink: &mut dyn EventSink,
    ) -> Result<DayOutcome> {
        tracing::info!(resource = %resource.id, label = %resource.label, %day, "Pulling day");

        let series = self.fetcher.fetch(session, &resource.id, day).await;

        if let DayVerdict::Incomplete(reason) = self.validator.check(&series) {
            return Ok(DayOutcome::Halted(HaltReason::Incomplete(reason)));
        }

        let events = match self.merger.merge(&series, &resource.label) {
            Ok(events) => events,
            Err(e) => return Ok(DayOutcome::Halted(HaltReason::Misaligned(e))),
        };

        for event in &events {
            sink.emit(event)?;
        }

        tracing::info!(
            resource = %resource.id,
            label = %resource.label,
            %day,
            events = events.len(),
            "Wrote day"
        );
        Ok(DayOutcome::Advanced {
            events: events.len(),
        })
    }
}

impl<S, F> std::fmt::Debug for Collector<S, F>
where
    S: CredentialSession,
    F: DayFetcher,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("validator", &self.validator)
            .field("merger", &self.merger)
            .finish_non_exhaustive()
    }
}
