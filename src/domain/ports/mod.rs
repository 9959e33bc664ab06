//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces that store adapters must
//! implement:
//! - JunctionStore: versioned load/save of the shared traffic snapshot
//!
//! These traits let the simulation, override and viewer services stay
//! independent of where the snapshot actually lives.

pub mod junction_store;

pub use junction_store::{update_snapshot, Committed, JunctionStore};
