//! Collection run: the default command.

use anyhow::{Context, Result};
use meter_ingest_collector::{Collector, RunSummary};
use meter_ingest_core::{CollectorConfig, SystemClock};
use meter_ingest_data::{FileCheckpointStore, XmlStreamSink};
use meter_ingest_powerclub::PowerclubClient;
use std::io::Write;
use std::sync::Arc;

/// Runs one collection, streaming events to `out`.
///
/// # Errors
/// Returns an error if the client cannot be built, login fails, a
/// checkpoint cannot be written, or `out` fails.
pub async fn run_collect<W>(config: CollectorConfig, out: W) -> Result<RunSummary>
where
    W: Write + Send,
{
    let client = PowerclubClient::new(config.api.clone()).context("failed to build API client")?;
    let checkpoints = Arc::new(FileCheckpointStore::new(config.checkpoint_dir.clone()));
    let clock = Arc::new(SystemClock::new(config.zone));

    let collector = Collector::new(client.clone(), client, checkpoints, clock, config.zone);

    let mut sink = XmlStreamSink::new(out);
    let summary = collector.run(&config.credentials, &mut sink).await?;

    for report in summary.halted() {
        if let Some(reason) = &report.halted {
            tracing::info!(
                resource = %report.resource_id,
                label = %report.label,
                cursor = ?report.end,
                %reason,
                "Resource halted"
            );
        }
    }
    Ok(summary)
}
