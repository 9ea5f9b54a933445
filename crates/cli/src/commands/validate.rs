//! `--validate-arguments`: check configuration without touching the network.

use meter_ingest_core::CollectorConfig;

/// Logs a configuration that already passed validation during loading.
pub fn run_validate(config: &CollectorConfig) {
    tracing::info!(
        email = %config.credentials.email,
        checkpoint_dir = %config.checkpoint_dir.display(),
        zone = ?config.zone,
        base_url = %config.api.base_url,
        "Configuration valid"
    );
}
