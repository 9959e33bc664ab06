//! In-memory store adapter.

pub mod junction_store;

pub use junction_store::InMemoryJunctionStore;
