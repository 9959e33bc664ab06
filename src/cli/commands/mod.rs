//! CLI command implementations.

pub mod init;
pub mod junctions;
pub mod override_cmd;
pub mod reset;
pub mod run;
pub mod simulate;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::open_store;
use crate::domain::models::Config;
use crate::domain::ports::JunctionStore;

/// Open the store the configuration points at.
pub(crate) async fn connect_store(config: &Config) -> Result<Arc<dyn JunctionStore>> {
    open_store(&config.store)
        .await
        .with_context(|| format!("Failed to open junction store at {}", config.store.path))
}
