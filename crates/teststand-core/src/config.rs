//! Configuration loading and typed config structures for the bridge.
//!
//! The canonical configuration lives in `teststand-config.yaml` at the
//! project root. This module defines strongly-typed structs mirroring
//! the YAML structure and a loader that reads the file, falling back to
//! defaults when the file or individual keys are absent.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level bridge configuration.
///
/// Mirrors the structure of `teststand-config.yaml`. All fields have
/// defaults so an empty or missing file yields a runnable bridge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Simulated client settings.
    #[serde(default)]
    pub simulator: SimulatorSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl BridgeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `TESTSTAND_PORT` environment variable overrides
    /// `server.port`, so deployments can remap the bind port without
    /// editing the YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.server.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document parses as YAML null, which a struct cannot
        // deserialize from, so blank input falls back to defaults.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        Ok(config)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override the bind port with `TESTSTAND_PORT` when set and valid.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TESTSTAND_PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            self.port = port;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Simulated client settings.
///
/// The simulator plays the role of the external rig: it pushes a random
/// temperature on an interval and answers start signals by calling the
/// two callback URLs after configurable delays.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulatorSettings {
    /// Whether the simulated client runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between simulated temperature readings.
    #[serde(default = "default_reading_interval_ms")]
    pub reading_interval_ms: u64,

    /// Lower bound of the simulated temperature range (Celsius).
    #[serde(default = "default_temperature_min")]
    pub temperature_min: f64,

    /// Upper bound of the simulated temperature range (Celsius).
    #[serde(default = "default_temperature_max")]
    pub temperature_max: f64,

    /// Milliseconds the simulated test "runs" before the test-done
    /// callback fires.
    #[serde(default = "default_test_duration_ms")]
    pub test_duration_ms: u64,

    /// Milliseconds between the test-done and analysis-done callbacks.
    #[serde(default = "default_analysis_duration_ms")]
    pub analysis_duration_ms: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reading_interval_ms: default_reading_interval_ms(),
            temperature_min: default_temperature_min(),
            temperature_max: default_temperature_max(),
            test_duration_ms: default_test_duration_ms(),
            analysis_duration_ms: default_analysis_duration_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins
    /// when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

const fn default_reading_interval_ms() -> u64 {
    5_000
}

const fn default_temperature_min() -> f64 {
    15.0
}

const fn default_temperature_max() -> f64 {
    35.0
}

const fn default_test_duration_ms() -> u64 {
    3_000
}

const fn default_analysis_duration_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BridgeConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.simulator.enabled);
        assert_eq!(config.simulator.reading_interval_ms, 5_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8000

simulator:
  enabled: false
  reading_interval_ms: 1000
  temperature_min: 10.0
  temperature_max: 20.0
  test_duration_ms: 500
  analysis_duration_ms: 250

logging:
  level: "debug"
"#;

        let config = BridgeConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.simulator.enabled);
        assert_eq!(config.simulator.reading_interval_ms, 1000);
        assert!((config.simulator.temperature_max - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "logging:\n  level: warn\n";
        let config = BridgeConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        // Level is overridden.
        assert_eq!(config.logging.level, "warn");
        // Everything else uses defaults.
        assert_eq!(config.server.port, 5000);
        assert!(config.simulator.enabled);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = BridgeConfig::parse("");
        assert!(config.is_ok());
    }
}
