//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors raised while starting or serving the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Path segment is not a `YYYY-MM-DD` calendar date
    #[error("Malformed date '{value}': {reason}")]
    MalformedDate { value: String, reason: String },

    /// Data source failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),

    /// Metrics recorder could not be installed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Socket bind or serve failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON body for error responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedDate { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_date_is_client_error() {
        let err = ApiError::MalformedDate {
            value: "not-a-date".to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("not-a-date"));
    }

    #[test]
    fn test_storage_error_is_server_error() {
        let err = ApiError::from(StorageError::EmptyDataset);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
