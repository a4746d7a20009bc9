//! HTTP error mapping.
//!
//! Every error leaves the service as the same JSON shape the comparison
//! endpoints use for in-band failures: `{"error": ..., "same_person": false}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facematch_core::DecodeError;
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400): missing fields, bad JSON, missing files.
    #[error("{0}")]
    BadRequest(String),

    /// Undecodable image payload (400).
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Request body exceeded the configured cap (413).
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Multipart form could not be processed (500).
    #[error("File processing error: {0}")]
    FileProcessing(String),

    /// Internal server error (500).
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::FileProcessing(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "same_person": false,
        }));
        (status, body).into_response()
    }
}
