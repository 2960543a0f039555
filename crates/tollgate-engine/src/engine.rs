//! The token lifecycle engine.
//!
//! State machine per token: `∅ → VALID → REVOKED`, with REVOKED terminal.
//! All four public operations are safe to run concurrently with each
//! other, including on the same token: create inserts a fresh token,
//! revoke is one atomic conditional update in the store, and list and
//! validate are read-only.

use crate::error::AuthError;
use crate::generate::generate_token;
use crate::membership::MembershipEvaluator;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tollgate_core::{DEFAULT_VALIDITY_DAYS, HistoryEntry, LifecycleOp, TokenRecord, TokenStatus};
use tollgate_store::{StoreError, TokenStore, UserDirectory};

/// Issues, revokes, lists and validates bearer tokens against an
/// injected store and directory.
pub struct TokenEngine {
    tokens: Arc<dyn TokenStore>,
    evaluator: MembershipEvaluator,
    validity: Duration,
}

impl TokenEngine {
    pub fn new(tokens: Arc<dyn TokenStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            tokens,
            evaluator: MembershipEvaluator::new(directory),
            validity: Duration::days(DEFAULT_VALIDITY_DAYS),
        }
    }

    /// Override the validity window applied at creation time.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn evaluator(&self) -> &MembershipEvaluator {
        &self.evaluator
    }

    /// Issue a new token owned by `user`.
    ///
    /// A duplicate-key failure on insert is treated as a generation
    /// collision: regenerate once and retry; a second failure surfaces
    /// as a storage error.
    pub async fn create(
        &self,
        user: &str,
        justification: &str,
    ) -> Result<TokenRecord, AuthError> {
        require_non_empty("user", user)?;
        require_non_empty("justification", justification)?;

        let now = Utc::now();
        let record = TokenRecord::issue(generate_token()?, user, justification, now, self.validity);

        match self.tokens.insert(record.clone()).await {
            Ok(()) => {
                tracing::info!(user, "issued token");
                Ok(record)
            }
            Err(StoreError::DuplicateToken(_)) => {
                let record =
                    TokenRecord::issue(generate_token()?, user, justification, now, self.validity);
                self.tokens.insert(record.clone()).await?;
                tracing::info!(user, "issued token after collision retry");
                Ok(record)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke `token` on behalf of its owner `user`.
    ///
    /// The store performs one atomic conditional update (owner matches,
    /// status currently VALID). When that misses, the miss is diagnosed
    /// under the exactly-one discipline: unknown or duplicated token is
    /// `NotFoundOrAmbiguous`, a foreign owner is `NotOwner`, and an
    /// already-revoked token is an idempotent success that appends
    /// nothing.
    pub async fn revoke(
        &self,
        user: &str,
        token: &str,
        justification: &str,
    ) -> Result<TokenRecord, AuthError> {
        require_non_empty("user", user)?;
        require_non_empty("token", token)?;
        require_non_empty("justification", justification)?;

        let entry = HistoryEntry::new(LifecycleOp::Revoke, user, justification, Utc::now());
        if let Some(updated) = self.tokens.revoke_valid(token, user, entry).await? {
            tracing::info!(user, "revoked token");
            return Ok(updated);
        }

        let record = self.expect_one_token(token).await?;
        if record.user != user {
            return Err(AuthError::NotOwner {
                user: user.to_string(),
            });
        }
        // Owner matched, so the status guard is what failed: the token
        // was already revoked. REVOKED is terminal, so returning the
        // record unchanged is the idempotent outcome.
        Ok(record)
    }

    /// All tokens owned by `user`, VALID entries before REVOKED ones,
    /// most recent expiry first within each group. An unknown user gets
    /// an empty list, not an error.
    pub async fn list(&self, user: &str) -> Result<Vec<TokenRecord>, AuthError> {
        require_non_empty("user", user)?;

        let mut records = self.tokens.find_by_user(user).await?;
        records.sort_by(|a, b| {
            (a.status == TokenStatus::Revoked)
                .cmp(&(b.status == TokenStatus::Revoked))
                .then(b.expiry_time.cmp(&a.expiry_time))
        });
        Ok(records)
    }

    /// Decide whether `token` admits a request gated on `required_groups`.
    ///
    /// Returns `Ok(false)` for a revoked or expired token — semantic
    /// invalidity is an answer, not an error. A malformed request or a
    /// broken store still fails.
    pub async fn validate(
        &self,
        required_groups: &[String],
        token: &str,
    ) -> Result<bool, AuthError> {
        require_non_empty("token", token)?;

        let record = self.expect_one_token(token).await?;
        if record.is_revoked() {
            return Ok(false);
        }
        if record.is_expired(Utc::now()) {
            return Ok(false);
        }
        self.evaluator.evaluate(required_groups, &record.user).await
    }

    async fn expect_one_token(&self, token: &str) -> Result<TokenRecord, AuthError> {
        let mut matches = self.tokens.find_by_token(token).await?;
        let matched = matches.len();
        match matches.pop() {
            Some(record) if matched == 1 => Ok(record),
            _ => Err(AuthError::NotFoundOrAmbiguous {
                entity: "token",
                key: token.to_string(),
                matched,
            }),
        }
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), AuthError> {
    if value.is_empty() {
        Err(AuthError::InvalidArgument(field))
    } else {
        Ok(())
    }
}
