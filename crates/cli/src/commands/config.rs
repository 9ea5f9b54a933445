//! Configuration resolution shared by the commands.

use crate::envelope;
use anyhow::{Context, Result};
use meter_ingest_core::{CollectorConfig, ConfigLoader, DEFAULT_CONFIG_PATH};
use std::io::{IsTerminal, Read};
use std::path::Path;

/// Loads the collector configuration.
///
/// With an explicit `--config` file, the file and `METER_*` environment
/// variables are used. Otherwise the control envelope on stdin is merged over
/// the default config file and the environment.
///
/// # Errors
/// Returns an error if stdin cannot be read, the envelope is malformed, or
/// the merged configuration is invalid.
pub fn resolve_config(explicit: Option<&Path>) -> Result<CollectorConfig> {
    if let Some(path) = explicit {
        return ConfigLoader::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let mut input = String::new();
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        stdin
            .lock()
            .read_to_string(&mut input)
            .context("failed to read control envelope from stdin")?;
    }

    let overrides = envelope::parse(&input)?;
    let config = ConfigLoader::load_with_overrides(Path::new(DEFAULT_CONFIG_PATH), &overrides)?;
    Ok(config)
}
