//! Postgres backend.
//!
//! One pool serves both the token collection and the directory read path.
//! The revocation path is a single conditional `UPDATE`, so two racing
//! revokes cannot both append a history entry.

use crate::error::StoreError;
use crate::{TokenStore, UserDirectory};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use tollgate_core::{HistoryEntry, TokenRecord, TokenStatus, UserRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS auth_tokens (
    token       TEXT PRIMARY KEY,
    username    TEXT NOT NULL,
    status      TEXT NOT NULL,
    expiry_time TIMESTAMPTZ NOT NULL,
    history     JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS auth_tokens_username_idx ON auth_tokens (username);

CREATE TABLE IF NOT EXISTS directory_users (
    username TEXT PRIMARY KEY,
    groups   JSONB
);
"#;

/// Token store and user directory on a shared Postgres pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist yet. Callers run this at
    /// startup; a failure here means the store is unreachable and the
    /// process must not serve requests.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("token store schema ensured");
        Ok(())
    }

    /// Upsert a directory user. This is the load seam for deployments
    /// and tests; the engine itself never writes here.
    pub async fn put_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO directory_users (username, groups) VALUES ($1, $2)
             ON CONFLICT (username) DO UPDATE SET groups = EXCLUDED.groups",
        )
        .bind(&record.user)
        .bind(record.groups.as_ref().map(Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Result<TokenRecord, StoreError> {
    let status_raw: String = row.try_get("status")?;
    let status = TokenStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Backend(format!("unknown token status '{status_raw}'")))?;
    let Json(history): Json<Vec<HistoryEntry>> = row.try_get("history")?;

    Ok(TokenRecord {
        token: row.try_get("token")?,
        user: row.try_get("username")?,
        status,
        expiry_time: row.try_get("expiry_time")?,
        history,
    })
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO auth_tokens (token, username, status, expiry_time, history)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.token)
        .bind(&record.user)
        .bind(record.status.as_str())
        .bind(record.expiry_time)
        .bind(Json(&record.history))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateToken(record.token))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Vec<TokenRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT token, username, status, expiry_time, history
               FROM auth_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_user(&self, user: &str) -> Result<Vec<TokenRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT token, username, status, expiry_time, history
               FROM auth_tokens WHERE username = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn revoke_valid(
        &self,
        token: &str,
        user: &str,
        entry: HistoryEntry,
    ) -> Result<Option<TokenRecord>, StoreError> {
        let row = sqlx::query(
            "UPDATE auth_tokens
                SET status = 'revoked', history = history || $3
              WHERE token = $1 AND username = $2 AND status = 'valid'
          RETURNING token, username, status, expiry_time, history",
        )
        .bind(token)
        .bind(user)
        .bind(Json(&entry))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user(&self, user: &str) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query("SELECT username, groups FROM directory_users WHERE username = $1")
            .bind(user)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let groups: Option<Json<BTreeSet<String>>> = row.try_get("groups")?;
                Ok(UserRecord {
                    user: row.try_get("username")?,
                    groups: groups.map(|Json(g)| g),
                })
            })
            .collect()
    }
}
