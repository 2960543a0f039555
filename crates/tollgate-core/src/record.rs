//! Token records and their lifecycle history.
//!
//! The serialized field names (`expiryTime`, `hist`, `operatingUser`) match
//! the wire shape consumers of this service already parse.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a token. A token starts VALID and can only move to
/// REVOKED; the transition never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Valid,
    Revoked,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "valid" => Some(Self::Valid),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation recorded in a token's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleOp {
    Create,
    Revoke,
}

impl std::fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Revoke => write!(f, "REVOKE"),
        }
    }
}

/// One lifecycle event. History entries are append-only; existing entries
/// are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    #[serde(rename = "operatingUser")]
    pub operating_user: String,
    pub operation: LifecycleOp,
    pub reason: String,
}

impl HistoryEntry {
    pub fn new(
        operation: LifecycleOp,
        operating_user: impl Into<String>,
        reason: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            time,
            operating_user: operating_user.into(),
            operation,
            reason: reason.into(),
        }
    }
}

/// One issued token. `token` and `user` are immutable once created;
/// `history` always holds at least the CREATE entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub user: String,
    pub status: TokenStatus,
    #[serde(rename = "expiryTime")]
    pub expiry_time: DateTime<Utc>,
    #[serde(rename = "hist")]
    pub history: Vec<HistoryEntry>,
}

impl TokenRecord {
    /// Build a freshly issued record: status VALID, expiry `now + validity`,
    /// and a single CREATE history entry operated by the owner.
    pub fn issue(
        token: impl Into<String>,
        user: impl Into<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        let user = user.into();
        Self {
            token: token.into(),
            user: user.clone(),
            status: TokenStatus::Valid,
            expiry_time: now + validity,
            history: vec![HistoryEntry::new(LifecycleOp::Create, user, reason, now)],
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.status == TokenStatus::Revoked
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_time
    }
}
