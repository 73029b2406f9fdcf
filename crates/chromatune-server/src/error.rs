//! Boundary-facing error mapping.
//!
//! Validation failures (size, media type, traversal) surface with a
//! specific status and message. Every other pipeline failure is logged
//! with full detail where it occurs and collapses to a single generic 500
//! so internal detail never leaks to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug)]
pub enum ApiError {
    /// Image payload exceeds the size limit.
    PayloadTooLarge,
    /// Payload did not declare an image content type.
    UnsupportedMediaType,
    /// Requested audio artifact absent, or a traversal attempt.
    NotFound,
    /// Malformed request body or settings.
    BadRequest(String),
    /// Any internal pipeline failure; details stay in the logs.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "image exceeds the 10 MiB limit".to_string(),
            ),
            ApiError::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "only image payloads are accepted".to_string(),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "audio file not found".to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "music generation failed, please try again".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
