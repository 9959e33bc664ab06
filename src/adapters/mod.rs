//! Infrastructure adapters for the junction store.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use crate::domain::models::{StoreBackend, StoreConfig};
use crate::domain::ports::JunctionStore;

/// Open the store described by `config`, running migrations for `SQLite`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn JunctionStore>, sqlite::DatabaseError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(memory::InMemoryJunctionStore::new())),
        StoreBackend::Sqlite => {
            let pool = sqlite::initialize_database(
                &config.database_url(),
                Some(sqlite::PoolConfig::with_max_connections(config.max_connections)),
            )
            .await?;
            tracing::debug!(path = %config.path, key = %config.key, "opened sqlite junction store");
            Ok(Arc::new(sqlite::SqliteJunctionStore::new(pool, config.key.clone())))
        }
    }
}
