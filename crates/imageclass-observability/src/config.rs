//! Observability configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Errors raised while interpreting logging settings
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLevel(String),
}

/// Log format for the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging options resolved from `[logging]` in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Console format
    pub format: LogFormat,

    /// Write per-run JSON log files (needs the `file-logging` feature)
    pub file_logging: bool,

    /// Base directory for per-run log folders (default: `./logs`)
    pub log_dir: Option<PathBuf>,

    /// Keep logs for N days
    pub retention_days: u64,

    /// Keep N most recent runs
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        LoggingOptions {
            level: "info".to_string(),
            format: LogFormat::Text,
            file_logging: false,
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// Normalize a user-facing level name into an `EnvFilter` directive
///
/// Accepts the usual spellings case-insensitively, including `WARNING`.
pub fn normalize_level(level: &str) -> Result<&'static str, ObservabilityError> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        _ => Err(ObservabilityError::UnknownLevel(level.to_string())),
    }
}
