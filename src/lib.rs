//! traffic-sync - shared traffic-junction state engine
//!
//! A fixed network of junctions lives in one shared store. An AI simulation
//! walks junction flow on a timer, operators override single junctions
//! (release, instant block, timed clear), and two viewers poll the store on
//! their own cadence.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): junction model, snapshot, commands, store port
//! - **Adapters** (`adapters`): in-memory and `SQLite` junction stores
//! - **Service Layer** (`services`): simulation engine, override controller, viewers
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use traffic_sync::adapters::memory::InMemoryJunctionStore;
//! use traffic_sync::domain::models::Command;
//! use traffic_sync::services::OverrideController;
//!
//! # async fn demo() -> traffic_sync::DomainResult<()> {
//! let store = Arc::new(InMemoryJunctionStore::new());
//! let controller = OverrideController::with_defaults(store);
//! let outcome = controller.execute(Command::timed_clear(3)).await?;
//! if let Some(animation) = outcome.animation {
//!     let report = animation.wait().await;
//!     assert_eq!(report.final_flow, 100);
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Command, Config, FlowStatus, Junction, JunctionId, NetworkSummary, OverrideAction,
    TrafficSnapshot, VersionedSnapshot,
};
pub use domain::ports::{update_snapshot, JunctionStore};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{OverrideController, SimulationEngine, TrafficRuntime, Viewer};
