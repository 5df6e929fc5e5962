//! Error types for the sirenscan HTTP API
//!
//! Client mistakes map to 4xx; anything else is an internal fault (500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::archive::ArchiveError;
use crate::services::ScanError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload or unpacked content over budget (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Scan exceeded its wall-clock budget (500)
    #[error("Scan timed out: {0}")]
    Timeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Scan failure, classified by cause
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Timeout(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Scan(ScanError::Archive(ArchiveError::Invalid(_))) => StatusCode::BAD_REQUEST,
            ApiError::Scan(ScanError::Archive(
                ArchiveError::TooManyEntries { .. } | ArchiveError::TooLarge { .. },
            )) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Scan(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Timeout(_) => "SCAN_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Scan(ScanError::Archive(ArchiveError::Invalid(_))) => "INVALID_ARCHIVE",
            ApiError::Scan(ScanError::Archive(
                ArchiveError::TooManyEntries { .. } | ArchiveError::TooLarge { .. },
            )) => "PAYLOAD_TOO_LARGE",
            ApiError::Scan(_) => "SCAN_ERROR",
        }
    }

    /// Message shown to the client
    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Timeout(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Scan(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
