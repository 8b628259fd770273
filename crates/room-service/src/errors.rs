//! Error types for the room service.
//!
//! `AlreadyClaimed`, `NotClaimHolder`, and `NotFound` are expected,
//! user-facing outcomes surfaced directly for UI feedback. Only
//! `StorageUnavailable` is eligible for caller-side retry: the underlying
//! conditional writes are idempotent, so a retried claim or release cannot
//! corrupt state.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Option is already claimed by another participant")]
    AlreadyClaimed,

    #[error("Option is claimed by a different participant")]
    NotClaimHolder,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Missing session identity")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RsError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            RsError::AlreadyClaimed => (
                StatusCode::CONFLICT,
                "ALREADY_CLAIMED",
                "Someone else already picked that option".to_string(),
            ),
            RsError::NotClaimHolder => (
                StatusCode::CONFLICT,
                "NOT_CLAIM_HOLDER",
                "That option is held by a different participant".to_string(),
            ),
            RsError::AlreadyExists(msg) => (StatusCode::CONFLICT, "ALREADY_EXISTS", msg.clone()),
            RsError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            RsError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "A session identity is required".to_string(),
            ),
            RsError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            RsError::StorageUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
                // Indeterminate outcome; safe to retry. No backend details leaked.
                "Storage is temporarily unavailable, please retry".to_string(),
            ),
            RsError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "An internal database error occurred".to_string(),
            ),
            RsError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes_map_to_conflict() {
        assert_eq!(
            RsError::AlreadyClaimed.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RsError::NotClaimHolder.into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_unavailable_maps_to_503() {
        let response = RsError::StorageUnavailable("pool timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        // Backend details must not leak into the response body
        let response = RsError::Database("connection refused at 10.0.0.7".to_string());
        let message = format!("{response}");
        assert!(message.contains("connection refused"));

        let http = response.into_response();
        assert_eq!(http.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = RsError::NotFound("room missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
