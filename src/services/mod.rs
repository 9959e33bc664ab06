//! Services that read and write the shared junction store.

pub mod override_controller;
pub mod simulation_engine;
pub mod traffic_runtime;
pub mod viewer;

pub use override_controller::{
    ramp_flow, AnimationHandle, AnimationOutcome, AnimationReport, CommandOutcome,
    OverrideConfig, OverrideController,
};
pub use simulation_engine::{
    advance_snapshot, AdvanceCounts, EngineHandle, EngineStatus, SimulationConfig,
    SimulationEngine, SimulationEvent, TickReport,
};
pub use traffic_runtime::{RuntimeHandle, TrafficRuntime};
pub use viewer::{Viewer, ViewerConfig, ViewerHandle, ViewerKind, ViewerState};
