//! Error mapping from the reconciler to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use idlink_reconciler::ReconcileError;

/// API-level error with the wire shape `{ "success": false, "error": .. }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client-caused: 400 with a human-readable message.
    #[error("{0}")]
    BadRequest(String),
    /// Unexpected failure: 500, detail shown only when `expose` is set
    /// (development-like environments).
    #[error("{detail}")]
    Internal { detail: String, expose: bool },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Maps a reconciler error, deciding detail exposure per environment.
    pub fn from_reconcile(err: ReconcileError, expose: bool) -> Self {
        match err {
            ReconcileError::InvalidInput => Self::BadRequest(err.to_string()),
            ReconcileError::Storage(storage) => {
                tracing::error!(category = %storage.category(), error = %storage, "resolve failed");
                Self::Internal {
                    detail: storage.to_string(),
                    expose,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal { detail, expose } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                if expose {
                    detail
                } else {
                    "Internal server error".to_string()
                },
            ),
        };

        let body = json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}
