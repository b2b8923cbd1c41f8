//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Webhook signature verification failed. Nothing was persisted; the
    /// sender should not retry without fixing the signature.
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// Webhook body could not be parsed as an event envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Upstream payment API failure after all fallback paths.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            // Webhook senders get a plain-text rejection.
            Self::SignatureInvalid => {
                return (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Self::MalformedPayload(msg) => {
                (StatusCode::BAD_REQUEST, "malformed_payload", msg.clone())
            }
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<paywatch_store::StoreError> for ApiError {
    fn from(err: paywatch_store::StoreError) -> Self {
        match err {
            paywatch_store::StoreError::NotFound => Self::NotFound("record not found".into()),
            paywatch_store::StoreError::Database(msg)
            | paywatch_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<crate::stripe::StripeError> for ApiError {
    fn from(err: crate::stripe::StripeError) -> Self {
        Self::Upstream(err.to_string())
    }
}
