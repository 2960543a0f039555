//! Error type for the storage backends.

use thiserror::Error;

/// Errors surfaced by token store and user directory backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit the uniqueness constraint on the token string.
    #[error("duplicate token '{0}'")]
    DuplicateToken(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure (lock poisoning, corrupt row, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}
