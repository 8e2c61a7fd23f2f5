use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::api::ApiResponse;

pub type RecResult<T> = Result<T, RecError>;

#[derive(Error, Debug)]
pub enum RecError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid interaction type: {0}")]
    InvalidType(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RecError {
    /// Machine-readable error kind carried in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RecError::Validation(_) => "validation_error",
            RecError::InvalidType(_) => "invalid_type",
            RecError::NotFound(_) => "not_found",
            RecError::Unauthorized(_) => "unauthorized",
            RecError::Storage(_) => "storage_error",
            RecError::Cache(_) => "cache_error",
            RecError::Serialization(_) => "serialization_error",
            RecError::Config(_) => "config_error",
            RecError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RecError::Validation(_) | RecError::InvalidType(_) => StatusCode::BAD_REQUEST,
            RecError::NotFound(_) => StatusCode::NOT_FOUND,
            RecError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
            "Internal processing error".to_string()
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "Request rejected");
            self.to_string()
        };

        (status, Json(ApiResponse::<()>::error(self.kind(), message))).into_response()
    }
}
