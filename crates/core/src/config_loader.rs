use crate::config::{CollectorConfig, RawConfig};
use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/Collector.toml";

/// Prefix of environment variable overrides, e.g. `METER_API__TIMEOUT_SECS`.
pub const ENV_PREFIX: &str = "METER_";

/// Values handed over by the invoking scheduler; they win over file and environment.
#[derive(Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl std::fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("checkpoint_dir", &self.checkpoint_dir)
            .field("timezone", &self.timezone)
            .finish()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging the TOML file and environment variables.
    ///
    /// A missing file is not an error; required keys are checked afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider cannot be parsed or validation fails.
    pub fn load(path: &Path) -> Result<CollectorConfig, ConfigError> {
        Self::load_with_overrides(path, &ConfigOverrides::default())
    }

    /// Loads configuration with scheduler-supplied overrides merged last.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider cannot be parsed or validation fails.
    pub fn load_with_overrides(
        path: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<CollectorConfig, ConfigError> {
        let raw: RawConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config = raw.validate()?;
        tracing::debug!(
            checkpoint_dir = %config.checkpoint_dir.display(),
            base_url = %config.api.base_url,
            "Configuration loaded"
        );
        Ok(config)
    }
}
