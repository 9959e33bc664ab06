//! Domain errors for the traffic-sync engine.

use thiserror::Error;

use crate::domain::models::JunctionId;

/// Domain-level errors that can occur while reading or mutating traffic state.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unknown junction: {0}")]
    UnknownJunction(JunctionId),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Concurrency conflict: expected version {expected}, store is at {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    #[error("Command on junction {0} was superseded by a newer command")]
    Superseded(JunctionId),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Errors that clear up on their own and only cost the current cycle.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::ConcurrencyConflict { .. }
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::MalformedSnapshot(err.to_string())
    }
}
