use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project config written by `init`.
pub const PROJECT_CONFIG_PATH: &str = ".traffic-sync/config.yaml";

/// Optional local overrides, never written by the tool.
pub const LOCAL_CONFIG_PATH: &str = ".traffic-sync/local.yaml";

/// Prefix for environment overrides, e.g. `TRAFFIC_SYNC_STORE__BACKEND=memory`.
pub const ENV_PREFIX: &str = "TRAFFIC_SYNC_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: must be greater than 0")]
    ZeroInterval { field: &'static str },

    #[error("Invalid delta range: delta_min ({0}) must not exceed delta_max ({1})")]
    InvertedDeltaRange(i32, i32),

    #[error(
        "Invalid override timing: step_interval_ms ({0}) must not exceed clear_duration_ms ({1})"
    )]
    StepExceedsDuration(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Store key cannot be empty")]
    EmptyStoreKey,

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid {field}: cannot be 0")]
    InvalidMaxRetries { field: &'static str },
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .traffic-sync/config.yaml (project config, created by init)
    /// 3. .traffic-sync/local.yaml (local overrides, optional)
    /// 4. Environment variables (`TRAFFIC_SYNC_*`, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(PROJECT_CONFIG_PATH))
            .merge(Yaml::file(LOCAL_CONFIG_PATH))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Store
        if config.store.key.trim().is_empty() {
            return Err(ConfigError::EmptyStoreKey);
        }
        if config.store.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.store.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.store.max_connections));
        }

        // Simulation
        let simulation = &config.simulation;
        if simulation.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "simulation.tick_interval_ms" });
        }
        if simulation.delta_min > simulation.delta_max {
            return Err(ConfigError::InvertedDeltaRange(
                simulation.delta_min,
                simulation.delta_max,
            ));
        }
        if simulation.max_conflict_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries {
                field: "simulation.max_conflict_retries",
            });
        }

        // Overrides
        let overrides = &config.overrides;
        if overrides.clear_duration_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "overrides.clear_duration_ms" });
        }
        if overrides.step_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "overrides.step_interval_ms" });
        }
        if overrides.step_interval_ms > overrides.clear_duration_ms {
            return Err(ConfigError::StepExceedsDuration(
                overrides.step_interval_ms,
                overrides.clear_duration_ms,
            ));
        }
        if overrides.max_conflict_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries {
                field: "overrides.max_conflict_retries",
            });
        }

        // Viewers
        if config.viewers.live_map_poll_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "viewers.live_map_poll_ms" });
        }
        if config.viewers.admin_poll_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "viewers.admin_poll_ms" });
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
