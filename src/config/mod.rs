pub mod exporter_config;
pub mod sensor_config;
pub mod session_config;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use exporter_config::ExporterConfig;
pub use sensor_config::SensorConfig;
pub use session_config::SessionConfig;

pub const CONFIG_FILE_NAME: &str = "mijia-exporter.json";

/// Where a loaded [`AppConfig`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default log filter, `RUST_LOG` takes precedence
    pub log_level: String,
    pub sensor: SensorConfig,
    pub session: SessionConfig,
    pub exporter: ExporterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: "info".to_string(),
            sensor: SensorConfig::default(),
            session: SessionConfig::default(),
            exporter: ExporterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from a configuration file.
    /// A missing file yields the defaults, a malformed one is an error.
    /// Runs before logging is set up, so the caller reports the source.
    pub async fn load_config(file_path: &Path) -> Result<(Self, ConfigSource)> {
        if !file_path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }

        let file_path_str = file_path.to_string_lossy();
        let config_json = fs::read_to_string(file_path)
            .await
            .with_context(|| format!("failed to read {}", file_path_str))?;
        let config: Self = serde_json::from_str(&config_json)
            .with_context(|| format!("failed to parse {}", file_path_str))?;

        Ok((config, ConfigSource::File))
    }
}
