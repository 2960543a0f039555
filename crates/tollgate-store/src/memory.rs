//! In-memory backends.
//!
//! Used by the engine test suite and by deployments that can tolerate
//! losing tokens on restart.

use crate::error::StoreError;
use crate::{TokenStore, UserDirectory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;
use tollgate_core::{HistoryEntry, TokenRecord, TokenStatus, UserRecord};

/// Token store backed by a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(format!("failed to acquire write lock: {e}")))?;

        match records.entry(record.token.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateToken(record.token)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<TokenRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(format!("failed to acquire read lock: {e}")))?;

        Ok(records.get(token).cloned().into_iter().collect())
    }

    async fn find_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Backend(format!("failed to acquire read lock: {e}")))?;

        Ok(records.values().filter(|r| r.user == user).cloned().collect())
    }

    async fn revoke_valid(
        &self,
        token: &str,
        user: &str,
        entry: HistoryEntry,
    ) -> Result<Option<TokenRecord>, StoreError> {
        // One write-lock critical section: the check and the mutation
        // cannot interleave with another revoke on the same token.
        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Backend(format!("failed to acquire write lock: {e}")))?;

        match records.get_mut(token) {
            Some(rec) if rec.user == user && rec.status == TokenStatus::Valid => {
                rec.status = TokenStatus::Revoked;
                rec.history.push(entry);
                Ok(Some(rec.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Directory backend backed by a process-local map. `put_user` is the
/// seam the external synchronization process (or a test) loads data
/// through; the engine itself only ever reads.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, record: UserRecord) {
        if let Ok(mut users) = self.users.write() {
            users.insert(record.user.clone(), record);
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_user(&self, user: &str) -> Result<Vec<UserRecord>, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|e| StoreError::Backend(format!("failed to acquire read lock: {e}")))?;

        Ok(users.get(user).cloned().into_iter().collect())
    }
}
