//! Junction store port.
//!
//! The store holds exactly one value, the whole [`TrafficSnapshot`], and
//! every writer replaces it wholesale. Saves are compare-and-swap on the
//! version read at load time, which is what keeps the simulation tick, the
//! override animation and operator commands from losing each other's writes.

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{seed_snapshot, TrafficSnapshot, VersionedSnapshot};

/// Repository interface for the shared traffic snapshot.
#[async_trait]
pub trait JunctionStore: Send + Sync {
    /// Load the current snapshot.
    ///
    /// Returns the seed snapshot at version 0 when nothing is stored, and the
    /// seed snapshot at the stored version when the stored payload is
    /// malformed, so the next save overwrites the corrupt record.
    async fn load(&self) -> DomainResult<VersionedSnapshot>;

    /// Replace the stored snapshot if it is still at `expected_version`.
    ///
    /// Returns the new version, or `ConcurrencyConflict` when another writer
    /// got there first.
    async fn save(&self, snapshot: &TrafficSnapshot, expected_version: u64) -> DomainResult<u64>;

    /// Overwrite whatever is stored with the seed snapshot.
    async fn reset(&self) -> DomainResult<u64> {
        let seed = seed_snapshot();
        loop {
            let current = self.load().await?;
            match self.save(&seed, current.version).await {
                Err(DomainError::ConcurrencyConflict { .. }) => continue,
                other => return other,
            }
        }
    }
}

/// Result of a successful read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// Whatever the mutation returned
    pub value: T,
    /// Version the snapshot was written at
    pub version: u64,
    /// The snapshot as written
    pub snapshot: TrafficSnapshot,
}

/// Load, mutate and save the snapshot, retrying from a fresh load on version
/// conflicts.
///
/// `mutate` may run more than once and must derive everything from the
/// snapshot it is handed. If it returns an error nothing is written and the
/// error is passed through. After `max_attempts` conflicts the last conflict
/// is returned.
pub async fn update_snapshot<S, F, T>(
    store: &S,
    max_attempts: u32,
    mut mutate: F,
) -> DomainResult<Committed<T>>
where
    S: JunctionStore + ?Sized,
    F: FnMut(&mut TrafficSnapshot) -> DomainResult<T> + Send,
    T: Send,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let VersionedSnapshot {
            version,
            mut snapshot,
        } = store.load().await?;

        let value = mutate(&mut snapshot)?;

        match store.save(&snapshot, version).await {
            Ok(new_version) => {
                return Ok(Committed {
                    value,
                    version: new_version,
                    snapshot,
                });
            }
            Err(DomainError::ConcurrencyConflict { expected, actual }) if attempt < max_attempts => {
                tracing::debug!(
                    attempt,
                    expected,
                    actual,
                    "snapshot version moved, retrying from a fresh load"
                );
            }
            Err(e) => return Err(e),
        }
    }
}
