//! Storage backends for token records and directory users.
//!
//! The engine consumes two narrow traits: [`TokenStore`] for the records it
//! owns, and [`UserDirectory`] for read-only membership lookups. Lookup
//! methods return *all* matches so the engine can apply its "exactly one
//! record" discipline; the backends additionally enforce token uniqueness
//! at the data layer.

use async_trait::async_trait;
use tollgate_core::{HistoryEntry, TokenRecord, UserRecord};

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::{MemoryDirectory, MemoryStore};
pub use postgres::PgStore;

/// Persistent collection of token records, keyed by token string.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a fresh record. Fails with [`StoreError::DuplicateToken`]
    /// when the token string already exists.
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError>;

    /// All records whose token string matches exactly.
    async fn find_by_token(&self, token: &str) -> Result<Vec<TokenRecord>, StoreError>;

    /// All records owned by `user`, in no particular order.
    async fn find_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, StoreError>;

    /// Atomic conditional revocation: where the token matches, the owner
    /// matches, and the status is currently VALID, flip the status to
    /// REVOKED and append `entry` to the history in one step. Returns the
    /// post-update record, or `None` when nothing matched.
    async fn revoke_valid(
        &self,
        token: &str,
        user: &str,
        entry: HistoryEntry,
    ) -> Result<Option<TokenRecord>, StoreError>;
}

/// Read-only lookup of directory users. Membership data is written by an
/// external synchronization process, never by this service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All user records whose identity matches exactly.
    async fn find_user(&self, user: &str) -> Result<Vec<UserRecord>, StoreError>;
}
