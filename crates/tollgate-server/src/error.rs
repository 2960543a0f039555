//! HTTP error mapping for the API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tollgate_engine::AuthError;

/// Errors a handler can surface to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The fronting proxy did not install a caller identity.
    #[error("missing or empty x-auth-user header")]
    MissingIdentity,

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingIdentity => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::NotOwner { .. }) => StatusCode::FORBIDDEN,
            ApiError::Auth(AuthError::NotFoundOrAmbiguous { .. }) => StatusCode::NOT_FOUND,
            ApiError::Auth(AuthError::RandomSource(_)) | ApiError::Auth(AuthError::Storage(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
