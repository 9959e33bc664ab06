//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - pretty or JSON console output
//! - optional rolling JSON log file

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy, LOG_FILE_NAME};
pub use logger::LoggerImpl;
