use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::AuthError;
use crate::db::store::StoreError;
use crate::identity::key::KeyError;
use crate::mirror::MirrorError;

/// Every way a request can fail. Rendered as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("content network failure: {0}")]
    ContentNetwork(#[from] MirrorError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::ReplayDetected) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::StaleTimestamp { .. }) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(AuthError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ContentNetwork(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<KeyError> for ApiError {
    fn from(e: KeyError) -> Self {
        ApiError::MalformedRequest(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::MalformedRequest(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("task join: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", self);
        } else {
            tracing::debug!(status = %status, "{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
