//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use traffic_sync::adapters::memory::InMemoryJunctionStore;
use traffic_sync::domain::models::{Junction, JunctionId, TrafficSnapshot, VersionedSnapshot};
use traffic_sync::{DomainError, DomainResult, JunctionStore};

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Create a temporary test database
///
/// Returns the path to a SQLite database file in a temporary directory.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let db_path = dir.path().join("traffic.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory store that can be switched off to simulate an outage, or made
/// to reject every save as if another writer always got there first.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryJunctionStore,
    down: Arc<AtomicBool>,
    contended: Arc<AtomicBool>,
    failed_calls: Arc<AtomicU64>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryJunctionStore {
        &self.inner
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_contended(&self, contended: bool) {
        self.contended.store(contended, Ordering::SeqCst);
    }

    pub fn failed_calls(&self) -> u64 {
        self.failed_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> DomainResult<()> {
        if self.down.load(Ordering::SeqCst) {
            self.failed_calls.fetch_add(1, Ordering::SeqCst);
            return Err(DomainError::StoreUnavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JunctionStore for FlakyStore {
    async fn load(&self) -> DomainResult<VersionedSnapshot> {
        self.check()?;
        self.inner.load().await
    }

    async fn save(&self, snapshot: &TrafficSnapshot, expected_version: u64) -> DomainResult<u64> {
        self.check()?;
        if self.contended.load(Ordering::SeqCst) {
            return Err(DomainError::ConcurrencyConflict {
                expected: expected_version,
                actual: expected_version + 1,
            });
        }
        self.inner.save(snapshot, expected_version).await
    }
}

/// Current record for `id`, panicking if it is missing.
pub async fn junction(store: &dyn JunctionStore, id: JunctionId) -> Junction {
    store
        .load()
        .await
        .expect("load failed")
        .snapshot
        .get(id)
        .cloned()
        .unwrap_or_else(|| panic!("junction {id} missing"))
}
