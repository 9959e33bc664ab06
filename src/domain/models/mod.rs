pub mod command;
pub mod config;
pub mod junction;
pub mod seed;
pub mod snapshot;

pub use command::{Command, OverrideAction};
pub use config::{
    Config, LoggingConfig, OverrideSettings, SimulationSettings, StoreBackend, StoreConfig,
    ViewerSettings,
};
pub use junction::{
    clamp_flow, FlowStatus, Junction, JunctionId, BLOCKED_FLOW, CLEARED_FLOW, CLEAR_AT,
    CONGESTED_BELOW, MAX_FLOW, MIN_FLOW,
};
pub use seed::{seed_junction_ids, seed_snapshot, SEED_VERSION};
pub use snapshot::{NetworkSummary, TrafficSnapshot, VersionedSnapshot};
