//! Error types for moodtunes-server
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with a
//! status that says which collaborator failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{ExtractionError, StorageError, UploadError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload body over the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Audio could not be classified (422)
    #[error("Feature extraction failed: {0}")]
    ExtractionFailed(String),

    /// Extractor exceeded its time budget (504)
    #[error("Feature extraction timed out: {0}")]
    ExtractionTimeout(String),

    /// Media store rejected the upload (502)
    #[error("Media storage failed: {0}")]
    StorageFailed(String),

    /// Media store did not answer in time (504)
    #[error("Media storage timed out")]
    StorageTimeout,

    /// Database read or write failed (500)
    #[error("Persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidInput(msg) => ApiError::BadRequest(msg),
            UploadError::Staging(e) => ApiError::Internal(format!("Failed to stage upload: {}", e)),
            UploadError::Extraction(e @ ExtractionError::Timeout(_)) => {
                ApiError::ExtractionTimeout(e.to_string())
            }
            UploadError::Extraction(e) => ApiError::ExtractionFailed(e.to_string()),
            UploadError::Storage(StorageError::Timeout) => ApiError::StorageTimeout,
            UploadError::Storage(e) => ApiError::StorageFailed(e.to_string()),
            UploadError::Persistence(e) => ApiError::Persistence(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::ExtractionFailed(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_FAILED", msg)
            }
            ApiError::ExtractionTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "EXTRACTION_TIMEOUT", msg)
            }
            ApiError::StorageFailed(msg) => (StatusCode::BAD_GATEWAY, "STORAGE_FAILED", msg),
            ApiError::StorageTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "STORAGE_TIMEOUT",
                "Media storage timed out".to_string(),
            ),
            ApiError::Persistence(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_FAILED",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
