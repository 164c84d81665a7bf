//!
//! Logger-facing configuration.
//!

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration of the service environment.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub log: Log,
}

impl Config {
    /// Load the configuration for the current environment, from
    /// `config/<environment>.toml` under the workspace root plus
    /// `KEEPSAKE__`-prefixed environment variables. Missing files fall back
    /// to defaults so tests and local tooling run without any setup.
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::new_with_config_path(None)
    }

    /// Load the configuration from an explicit file path instead of the
    /// environment-derived default location.
    pub fn new_with_config_path(
        explicit_config_path: Option<PathBuf>,
    ) -> Result<Self, config::ConfigError> {
        let environment = crate::env::which();
        let config_path = Self::config_path(&environment.to_string(), explicit_config_path);

        let config = config::Config::builder()
            .add_source(config::File::from(config_path).required(false))
            .add_source(config::Environment::with_prefix("KEEPSAKE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Path to the config file for the given environment name.
    pub fn config_path(environment: &str, explicit_config_path: Option<PathBuf>) -> PathBuf {
        explicit_config_path.unwrap_or_else(|| {
            let mut config_path = crate::env::workspace_path();
            config_path.push("config");
            config_path.push(environment.to_lowercase());
            config_path.set_extension("toml");
            config_path
        })
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Log {
    /// Logging to a console.
    pub console: LogConsole,
    /// Logging to a file.
    pub file: LogFile,
}

/// Configuration of the console output.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConsole {
    /// Whether console output is enabled.
    pub enabled: bool,
    /// Minimum level to emit for watched crates.
    pub level: Level,
    /// Human-readable or JSON lines.
    pub log_format: LogFormat,
}

impl Default for LogConsole {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::Info,
            log_format: LogFormat::Default,
        }
    }
}

/// Configuration of the rolling file output.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogFile {
    /// Whether file output is enabled.
    pub enabled: bool,
    /// Minimum level to write to the file.
    pub level: Level,
    /// Directory for log files, relative to the workspace root.
    pub path: String,
    /// Base name of the log file.
    pub file_name: String,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::Debug,
            path: "logs".into(),
            file_name: "keepsake.log".into(),
        }
    }
}

/// Format of the console output.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Default,
    /// One JSON document per event.
    Json,
}

/// Log level wrapper deserializable from configuration.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    /// Convert into the `tracing` level.
    pub fn into_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
