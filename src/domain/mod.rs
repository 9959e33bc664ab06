//! Domain layer for the traffic-sync engine
//!
//! This module contains the junction data model, the store port and the
//! domain error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
