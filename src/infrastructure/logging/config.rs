use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Name of the rolling log file inside `log_dir`.
pub const LOG_FILE_NAME: &str = "traffic-sync.log";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to the console)
    pub log_dir: Option<PathBuf>,

    /// Enable console logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl RotationPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "hourly" => Some(Self::Hourly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

impl TryFrom<&LoggingConfig> for LogConfig {
    type Error = anyhow::Error;

    fn try_from(settings: &LoggingConfig) -> Result<Self, Self::Error> {
        let format = LogFormat::parse(&settings.format)
            .ok_or_else(|| anyhow::anyhow!("Invalid log format: {}", settings.format))?;
        let rotation = RotationPolicy::parse(&settings.rotation)
            .ok_or_else(|| anyhow::anyhow!("Invalid log rotation: {}", settings.rotation))?;

        Ok(Self {
            level: settings.level.clone(),
            format,
            log_dir: settings.log_dir.as_ref().map(PathBuf::from),
            enable_stdout: true,
            rotation,
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}
