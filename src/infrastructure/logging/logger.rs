use super::config::{LogConfig, LogFormat, RotationPolicy, LOG_FILE_NAME};
use anyhow::{Context, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
///
/// Hold the value for the life of the process; dropping it flushes and
/// closes the file writer.
pub struct LoggerImpl {
    guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber.
    ///
    /// Console output goes to stderr so command output on stdout stays
    /// clean for `--json`. `RUST_LOG` overrides the configured level.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let filter = || {
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if let Some(ref log_dir) = config.log_dir {
            let file_appender = match config.rotation {
                RotationPolicy::Daily => rolling::daily(log_dir, LOG_FILE_NAME),
                RotationPolicy::Hourly => rolling::hourly(log_dir, LOG_FILE_NAME),
                RotationPolicy::Never => rolling::never(log_dir, LOG_FILE_NAME),
            };
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            // File layer - always JSON for structured logging
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(filter())
                    .boxed(),
            );
        }

        if config.enable_stdout {
            let console = match config.format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true)
                    .with_filter(filter())
                    .boxed(),
                LogFormat::Pretty => tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_filter(filter())
                    .boxed(),
            };
            layers.push(console);
        }

        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { guard })
    }

    /// Whether a file writer is attached
    pub fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}
