//! End-to-end lifecycle tests for the token engine, run against the
//! in-memory backends plus purpose-built store doubles for the failure
//! modes the real backends cannot produce.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tollgate_core::{HistoryEntry, LifecycleOp, TokenRecord, TokenStatus, UserRecord};
use tollgate_engine::{AuthError, TOKEN_LEN, TokenEngine};
use tollgate_store::{MemoryDirectory, MemoryStore, StoreError, TokenStore, UserDirectory};

fn groups(names: &[&str]) -> Vec<String> {
    names.iter().map(|g| g.to_string()).collect()
}

fn engine_with_directory() -> (TokenEngine, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new());
    let engine = TokenEngine::new(Arc::new(MemoryStore::new()), directory.clone());
    (engine, directory)
}

#[tokio::test]
async fn create_issues_a_valid_week_long_token() {
    let (engine, _) = engine_with_directory();

    let before = Utc::now();
    let record = engine.create("alice", "ci deploy key").await.unwrap();

    assert_eq!(record.user, "alice");
    assert_eq!(record.status, TokenStatus::Valid);
    assert_eq!(record.token.len(), TOKEN_LEN);
    assert!(
        record
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );

    assert_eq!(record.history.len(), 1);
    assert_eq!(record.history[0].operation, LifecycleOp::Create);
    assert_eq!(record.history[0].operating_user, "alice");
    assert_eq!(record.history[0].reason, "ci deploy key");

    let drift = record.expiry_time - (before + Duration::days(7));
    assert!(drift.num_seconds().abs() <= 5);
}

#[tokio::test]
async fn revoke_by_owner_appends_one_revoke_entry() {
    let (engine, _) = engine_with_directory();
    let record = engine.create("alice", "initial").await.unwrap();

    let revoked = engine
        .revoke("alice", &record.token, "laptop stolen")
        .await
        .unwrap();

    assert_eq!(revoked.status, TokenStatus::Revoked);
    assert_eq!(revoked.history.len(), 2);
    let last = revoked.history.last().unwrap();
    assert_eq!(last.operation, LifecycleOp::Revoke);
    assert_eq!(last.operating_user, "alice");
    assert_eq!(last.reason, "laptop stolen");
}

#[tokio::test]
async fn revoke_by_non_owner_fails_without_mutation() {
    let (engine, _) = engine_with_directory();
    let record = engine.create("alice", "initial").await.unwrap();

    let err = engine
        .revoke("mallory", &record.token, "takeover")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotOwner { user } if user == "mallory"));

    let listed = engine.list("alice").await.unwrap();
    assert_eq!(listed[0].status, TokenStatus::Valid);
    assert_eq!(listed[0].history.len(), 1);
}

#[tokio::test]
async fn revoke_of_unknown_token_is_not_found() {
    let (engine, _) = engine_with_directory();

    let err = engine
        .revoke("alice", "no-such-token", "cleanup")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous { matched: 0, .. }
    ));
}

#[tokio::test]
async fn second_revoke_is_an_idempotent_no_op() {
    let (engine, _) = engine_with_directory();
    let record = engine.create("alice", "initial").await.unwrap();

    let first = engine
        .revoke("alice", &record.token, "first pass")
        .await
        .unwrap();
    let second = engine
        .revoke("alice", &record.token, "second pass")
        .await
        .unwrap();

    assert_eq!(second.status, TokenStatus::Revoked);
    assert_eq!(second.history.len(), first.history.len());
    assert_eq!(second.history.last().unwrap().reason, "first pass");
}

#[tokio::test]
async fn validate_is_false_for_revoked_tokens_regardless_of_groups() {
    let (engine, directory) = engine_with_directory();
    directory.put_user(UserRecord::with_groups("alice", ["g1"]));

    let record = engine.create("alice", "initial").await.unwrap();
    engine
        .revoke("alice", &record.token, "rotated")
        .await
        .unwrap();

    assert!(!engine.validate(&groups(&["g1"]), &record.token).await.unwrap());
    assert!(!engine.validate(&[], &record.token).await.unwrap());
}

#[tokio::test]
async fn validate_is_false_for_expired_tokens() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.put_user(UserRecord::with_groups("alice", ["g1"]));
    let engine = TokenEngine::new(Arc::new(MemoryStore::new()), directory)
        .with_validity(Duration::seconds(-1));

    let record = engine.create("alice", "short lived").await.unwrap();

    assert!(!engine.validate(&groups(&["g1"]), &record.token).await.unwrap());
}

#[tokio::test]
async fn validate_checks_group_containment_of_the_owner() {
    let (engine, directory) = engine_with_directory();
    directory.put_user(UserRecord::with_groups("alice", ["g1", "g2", "g5"]));

    let record = engine.create("alice", "initial").await.unwrap();

    assert!(engine.validate(&groups(&["g1", "g5"]), &record.token).await.unwrap());
    assert!(engine.validate(&groups(&["g2"]), &record.token).await.unwrap());
    assert!(!engine.validate(&groups(&["g1", "g9"]), &record.token).await.unwrap());
}

#[tokio::test]
async fn empty_requirement_is_satisfied_even_without_stored_groups() {
    let (engine, directory) = engine_with_directory();
    // No groups field at all.
    directory.put_user(UserRecord::new("dave"));

    let record = engine.create("dave", "initial").await.unwrap();

    assert!(engine.validate(&[], &record.token).await.unwrap());
    // A non-empty requirement still fails for the same user.
    assert!(!engine.validate(&groups(&["g1"]), &record.token).await.unwrap());
}

#[tokio::test]
async fn empty_group_set_behaves_like_a_missing_one() {
    let (engine, directory) = engine_with_directory();
    directory.put_user(UserRecord::with_groups("erin", Vec::<String>::new()));

    let record = engine.create("erin", "initial").await.unwrap();

    assert!(engine.validate(&[], &record.token).await.unwrap());
    assert!(!engine.validate(&groups(&["g1"]), &record.token).await.unwrap());
}

#[tokio::test]
async fn missing_directory_user_is_an_error_not_false() {
    let (engine, _) = engine_with_directory();
    let record = engine.create("ghost", "initial").await.unwrap();

    let err = engine
        .validate(&groups(&["g1"]), &record.token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous {
            entity: "user",
            matched: 0,
            ..
        }
    ));

    let err = engine
        .evaluator()
        .evaluate(&groups(&["g1"]), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous { matched: 0, .. }
    ));
}

#[tokio::test]
async fn list_puts_valid_tokens_before_revoked_ones() {
    let (engine, _) = engine_with_directory();

    let first = engine.create("alice", "one").await.unwrap();
    let _second = engine.create("alice", "two").await.unwrap();
    let third = engine.create("alice", "three").await.unwrap();
    engine.revoke("alice", &first.token, "rotated").await.unwrap();
    engine.revoke("alice", &third.token, "rotated").await.unwrap();

    let listed = engine.list("alice").await.unwrap();
    assert_eq!(listed.len(), 3);
    let first_revoked_at = listed
        .iter()
        .position(|r| r.status == TokenStatus::Revoked)
        .unwrap();
    assert!(
        listed[..first_revoked_at]
            .iter()
            .all(|r| r.status == TokenStatus::Valid)
    );
    assert!(
        listed[first_revoked_at..]
            .iter()
            .all(|r| r.status == TokenStatus::Revoked)
    );
}

#[tokio::test]
async fn list_of_an_unknown_user_is_empty_not_an_error() {
    let (engine, _) = engine_with_directory();
    assert!(engine.list("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn create_then_validate_round_trip() {
    let (engine, directory) = engine_with_directory();
    directory.put_user(UserRecord::with_groups("alice", ["g1", "g2"]));

    let record = engine.create("alice", "round trip").await.unwrap();

    assert!(engine.validate(&[], &record.token).await.unwrap());
    assert!(engine.validate(&groups(&["g1", "g2"]), &record.token).await.unwrap());
}

// ---------------------------------------------------------------------------
// Store doubles for failure modes the real backends cannot produce.
// ---------------------------------------------------------------------------

/// Fails the first `failures` inserts with a duplicate-key error.
struct CollidingStore {
    inner: MemoryStore,
    remaining: AtomicUsize,
}

impl CollidingStore {
    fn new(failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl TokenStore for CollidingStore {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError> {
        if self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::DuplicateToken(record.token));
        }
        self.inner.insert(record).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<TokenRecord>, StoreError> {
        self.inner.find_by_token(token).await
    }

    async fn find_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, StoreError> {
        self.inner.find_by_user(user).await
    }

    async fn revoke_valid(
        &self,
        token: &str,
        user: &str,
        entry: HistoryEntry,
    ) -> Result<Option<TokenRecord>, StoreError> {
        self.inner.revoke_valid(token, user, entry).await
    }
}

/// Returns two copies of every record, simulating a corrupted
/// collection that lost its uniqueness guarantee.
struct DuplicatedStore {
    inner: MemoryStore,
}

#[async_trait]
impl TokenStore for DuplicatedStore {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError> {
        self.inner.insert(record).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<TokenRecord>, StoreError> {
        let mut found = self.inner.find_by_token(token).await?;
        let doubled = found.clone();
        found.extend(doubled);
        Ok(found)
    }

    async fn find_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, StoreError> {
        self.inner.find_by_user(user).await
    }

    async fn revoke_valid(
        &self,
        _token: &str,
        _user: &str,
        _entry: HistoryEntry,
    ) -> Result<Option<TokenRecord>, StoreError> {
        // The conditional update never matches a duplicated collection.
        Ok(None)
    }
}

#[tokio::test]
async fn create_retries_exactly_once_on_token_collision() {
    let directory = Arc::new(MemoryDirectory::new());

    // One collision: absorbed by the single retry.
    let engine = TokenEngine::new(Arc::new(CollidingStore::new(1)), directory.clone());
    let record = engine.create("alice", "collide once").await.unwrap();
    assert_eq!(record.status, TokenStatus::Valid);

    // Two collisions: the single retry is used up, the failure surfaces.
    let engine = TokenEngine::new(Arc::new(CollidingStore::new(2)), directory);
    let err = engine.create("alice", "collide twice").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Storage(StoreError::DuplicateToken(_))
    ));
}

#[tokio::test]
async fn duplicated_token_records_are_an_integrity_failure() {
    let store = DuplicatedStore {
        inner: MemoryStore::new(),
    };
    let directory = Arc::new(MemoryDirectory::new());
    let engine = TokenEngine::new(Arc::new(store), directory);

    let record = engine.create("alice", "initial").await.unwrap();

    let err = engine.validate(&[], &record.token).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous {
            entity: "token",
            matched: 2,
            ..
        }
    ));

    let err = engine
        .revoke("alice", &record.token, "cleanup")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous { matched: 2, .. }
    ));
}

/// Directory double with two records for the same identity.
struct AmbiguousDirectory;

#[async_trait]
impl UserDirectory for AmbiguousDirectory {
    async fn find_user(&self, user: &str) -> Result<Vec<UserRecord>, StoreError> {
        Ok(vec![
            UserRecord::with_groups(user, ["g1"]),
            UserRecord::new(user),
        ])
    }
}

#[tokio::test]
async fn ambiguous_directory_entries_are_an_integrity_failure() {
    let engine = TokenEngine::new(Arc::new(MemoryStore::new()), Arc::new(AmbiguousDirectory));
    let record = engine.create("alice", "initial").await.unwrap();

    let err = engine
        .validate(&groups(&["g1"]), &record.token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::NotFoundOrAmbiguous {
            entity: "user",
            matched: 2,
            ..
        }
    ));
}
