//! Error taxonomy of the lifecycle engine.

use thiserror::Error;
use tollgate_store::StoreError;

/// Typed failures surfaced by the engine. None of these are retried
/// internally; they propagate directly to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad caller input; raised before any I/O is attempted.
    #[error("invalid argument: '{0}' must be a non-empty string")]
    InvalidArgument(&'static str),

    /// The secure random source is unavailable; fatal to the create call.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),

    /// Zero or more than one record matched where exactly one was
    /// required. Duplicates are a data-integrity violation, not success.
    #[error("expected exactly one {entity} record for '{key}', found {matched}")]
    NotFoundOrAmbiguous {
        entity: &'static str,
        key: String,
        matched: usize,
    },

    /// Revocation attempted by a user who does not own the token.
    #[error("token is not owned by '{user}'")]
    NotOwner { user: String },

    /// Underlying persistence failure.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}
