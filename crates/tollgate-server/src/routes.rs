//! HTTP routes fronting the lifecycle engine.
//!
//! Transport authentication is out of scope here: callers reach this
//! service through an authenticating proxy that installs the verified
//! identity in the `x-auth-user` header.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tollgate_core::TokenRecord;
use tower_http::trace::TraceLayer;

/// Justifications recorded for API-driven lifecycle events.
const CREATE_REASON: &str = "created via api";
const REVOKE_REASON: &str = "revoked via api";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/tokens", get(list_tokens).post(create_token))
        .route("/api/tokens/revoke", post(revoke_token))
        .route("/api/tokens/check", post(check_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-auth-user")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or(ApiError::MissingIdentity)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "tollgate-server" }))
}

async fn create_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenRecord>, ApiError> {
    let user = caller(&headers)?;
    let record = state.engine().create(&user, CREATE_REASON).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: String,
}

async fn revoke_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<TokenRecord>, ApiError> {
    let user = caller(&headers)?;
    let record = state
        .engine()
        .revoke(&user, &req.token, REVOKE_REASON)
        .await?;
    Ok(Json(record))
}

async fn list_tokens(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TokenRecord>>, ApiError> {
    let user = caller(&headers)?;
    let records = state.engine().list(&user).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub token: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub ok: bool,
}

async fn check_token(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let ok = state.engine().validate(&req.groups, &req.token).await?;
    Ok(Json(CheckResponse { ok }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn caller_requires_a_non_empty_identity_header() {
        let mut headers = HeaderMap::new();
        assert!(matches!(caller(&headers), Err(ApiError::MissingIdentity)));

        headers.insert("x-auth-user", HeaderValue::from_static("  "));
        assert!(matches!(caller(&headers), Err(ApiError::MissingIdentity)));

        headers.insert("x-auth-user", HeaderValue::from_static("alice"));
        assert_eq!(caller(&headers).unwrap(), "alice");
    }

    #[test]
    fn check_request_defaults_to_no_required_groups() {
        let req: CheckRequest = serde_json::from_str(r#"{"token":"tok"}"#).unwrap();
        assert!(req.groups.is_empty());

        let req: CheckRequest =
            serde_json::from_str(r#"{"token":"tok","groups":["g1","g5"]}"#).unwrap();
        assert_eq!(req.groups, vec!["g1".to_string(), "g5".to_string()]);
    }
}
