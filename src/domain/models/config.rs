use serde::{Deserialize, Serialize};

/// Main configuration structure for traffic-sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Junction store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Simulation engine configuration
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Operator override configuration
    #[serde(default)]
    pub overrides: OverrideSettings,

    /// Viewer polling configuration
    #[serde(default)]
    pub viewers: ViewerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which store backend holds the shared snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on exit
    Memory,
    /// `SQLite` file shared by every process that opens it
    Sqlite,
}

/// Junction store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Key the snapshot is stored under
    #[serde(default = "default_store_key")]
    pub key: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

fn default_database_path() -> String {
    ".traffic-sync/traffic.db".to_string()
}

fn default_store_key() -> String {
    "trafficState".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_database_path(),
            key: default_store_key(),
            max_connections: default_max_connections(),
        }
    }
}

impl StoreConfig {
    /// sqlx connection URL for the configured path.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Simulation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationSettings {
    /// Milliseconds between ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Smallest per-tick flow change (inclusive)
    #[serde(default = "default_delta_min")]
    pub delta_min: i32,

    /// Largest per-tick flow change (inclusive)
    #[serde(default = "default_delta_max")]
    pub delta_max: i32,

    /// Fixed RNG seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Attempts per tick when the store reports a version conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_delta_min() -> i32 {
    -5
}

const fn default_delta_max() -> i32 {
    4
}

const fn default_max_conflict_retries() -> u32 {
    5
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            delta_min: default_delta_min(),
            delta_max: default_delta_max(),
            seed: None,
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

/// Operator override configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OverrideSettings {
    /// Total duration of a timed clear in milliseconds
    #[serde(default = "default_clear_duration_ms")]
    pub clear_duration_ms: u64,

    /// Milliseconds between timed clear steps
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Attempts per write when the store reports a version conflict
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

const fn default_clear_duration_ms() -> u64 {
    5000
}

const fn default_step_interval_ms() -> u64 {
    100
}

impl Default for OverrideSettings {
    fn default() -> Self {
        Self {
            clear_duration_ms: default_clear_duration_ms(),
            step_interval_ms: default_step_interval_ms(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

/// Viewer polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ViewerSettings {
    /// Live map poll interval in milliseconds
    #[serde(default = "default_live_map_poll_ms")]
    pub live_map_poll_ms: u64,

    /// Admin view poll interval in milliseconds
    #[serde(default = "default_admin_poll_ms")]
    pub admin_poll_ms: u64,
}

const fn default_live_map_poll_ms() -> u64 {
    1000
}

const fn default_admin_poll_ms() -> u64 {
    500
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            live_map_poll_ms: default_live_map_poll_ms(),
            admin_poll_ms: default_admin_poll_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
