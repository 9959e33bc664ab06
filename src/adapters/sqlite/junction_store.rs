//! SQLite implementation of the JunctionStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{seed_snapshot, TrafficSnapshot, VersionedSnapshot};
use crate::domain::ports::JunctionStore;

/// Snapshot store backed by one row of `traffic_snapshots`.
///
/// Every process that opens the same database file with the same key sees
/// the same state.
#[derive(Clone)]
pub struct SqliteJunctionStore {
    pool: SqlitePool,
    key: String,
}

impl SqliteJunctionStore {
    pub fn new(pool: SqlitePool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the stored payload without validation, bumping the version.
    pub async fn put_raw(&self, payload: &str) -> DomainResult<u64> {
        let row: (i64,) = sqlx::query_as(
            r"INSERT INTO traffic_snapshots (store_key, version, payload, updated_at)
               VALUES (?, 1, ?, ?)
               ON CONFLICT(store_key) DO UPDATE SET
                   version = version + 1,
                   payload = excluded.payload,
                   updated_at = excluded.updated_at
               RETURNING version",
        )
        .bind(&self.key)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        to_version(row.0)
    }

    async fn current_version(&self) -> DomainResult<u64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM traffic_snapshots WHERE store_key = ?")
                .bind(&self.key)
                .fetch_optional(&self.pool)
                .await?;

        row.map_or(Ok(0), |(v,)| to_version(v))
    }
}

#[async_trait]
impl JunctionStore for SqliteJunctionStore {
    async fn load(&self) -> DomainResult<VersionedSnapshot> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, payload FROM traffic_snapshots WHERE store_key = ?")
                .bind(&self.key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((version, payload)) = row else {
            return Ok(VersionedSnapshot::new(0, seed_snapshot()));
        };
        let version = to_version(version)?;

        match TrafficSnapshot::from_json(&payload) {
            Ok(snapshot) => Ok(VersionedSnapshot::new(version, snapshot)),
            Err(e) => {
                tracing::warn!(
                    store_key = %self.key,
                    version,
                    error = %e,
                    "stored snapshot is malformed, falling back to seed"
                );
                Ok(VersionedSnapshot::new(version, seed_snapshot()))
            }
        }
    }

    async fn save(&self, snapshot: &TrafficSnapshot, expected_version: u64) -> DomainResult<u64> {
        snapshot.validate()?;
        let payload = snapshot.to_json()?;
        let now = Utc::now().to_rfc3339();

        let rows_affected = if expected_version == 0 {
            sqlx::query(
                r"INSERT OR IGNORE INTO traffic_snapshots (store_key, version, payload, updated_at)
                   VALUES (?, 1, ?, ?)",
            )
            .bind(&self.key)
            .bind(&payload)
            .bind(&now)
            .execute(&self.pool)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                r"UPDATE traffic_snapshots SET version = version + 1, payload = ?, updated_at = ?
                   WHERE store_key = ? AND version = ?",
            )
            .bind(&payload)
            .bind(&now)
            .bind(&self.key)
            .bind(to_column(expected_version)?)
            .execute(&self.pool)
            .await?
            .rows_affected()
        };

        if rows_affected == 0 {
            return Err(DomainError::ConcurrencyConflict {
                expected: expected_version,
                actual: self.current_version().await?,
            });
        }

        Ok(expected_version + 1)
    }
}

fn to_version(value: i64) -> DomainResult<u64> {
    u64::try_from(value)
        .map_err(|_| DomainError::MalformedSnapshot(format!("negative snapshot version {value}")))
}

fn to_column(version: u64) -> DomainResult<i64> {
    i64::try_from(version)
        .map_err(|_| DomainError::ValidationFailed(format!("snapshot version {version} overflows")))
}
