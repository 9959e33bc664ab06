//! In-process implementation of the JunctionStore.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{seed_snapshot, TrafficSnapshot, VersionedSnapshot};
use crate::domain::ports::JunctionStore;

/// What the store physically holds: a version and the serialized payload.
///
/// Keeping the payload serialized means every load parses it, exactly like
/// the `SQLite` adapter, and malformed data can be injected for recovery tests.
#[derive(Debug, Clone)]
struct StoredRecord {
    version: u64,
    payload: String,
}

/// Snapshot store shared by every task in one process.
///
/// Cloning yields another handle onto the same record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJunctionStore {
    record: Arc<RwLock<Option<StoredRecord>>>,
}

impl InMemoryJunctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored payload without validation, bumping the version.
    ///
    /// Mirrors an outside writer putting arbitrary data under the store key.
    pub async fn put_raw(&self, payload: impl Into<String>) -> u64 {
        let mut record = self.record.write().await;
        let version = record.as_ref().map_or(0, |r| r.version) + 1;
        *record = Some(StoredRecord {
            version,
            payload: payload.into(),
        });
        version
    }

    /// The raw stored payload, if any.
    pub async fn raw(&self) -> Option<String> {
        self.record.read().await.as_ref().map(|r| r.payload.clone())
    }

    /// Current stored version without parsing the payload.
    pub async fn version(&self) -> u64 {
        self.record.read().await.as_ref().map_or(0, |r| r.version)
    }
}

#[async_trait]
impl JunctionStore for InMemoryJunctionStore {
    async fn load(&self) -> DomainResult<VersionedSnapshot> {
        let record = self.record.read().await.clone();

        let Some(record) = record else {
            return Ok(VersionedSnapshot::new(0, seed_snapshot()));
        };

        match TrafficSnapshot::from_json(&record.payload) {
            Ok(snapshot) => Ok(VersionedSnapshot::new(record.version, snapshot)),
            Err(e) => {
                tracing::warn!(
                    version = record.version,
                    error = %e,
                    "stored snapshot is malformed, falling back to seed"
                );
                Ok(VersionedSnapshot::new(record.version, seed_snapshot()))
            }
        }
    }

    async fn save(&self, snapshot: &TrafficSnapshot, expected_version: u64) -> DomainResult<u64> {
        snapshot.validate()?;
        let payload = snapshot.to_json()?;

        let mut record = self.record.write().await;
        let actual = record.as_ref().map_or(0, |r| r.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                expected: expected_version,
                actual,
            });
        }

        let version = actual + 1;
        *record = Some(StoredRecord { version, payload });
        Ok(version)
    }
}
