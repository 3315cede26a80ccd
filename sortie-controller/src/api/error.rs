//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::repository::StoreError;
use crate::service::HandlerError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    Timeout(String),
    UpstreamError(String),
    StorageError(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Timeout(msg) => {
                tracing::error!("Invocation timed out: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, msg)
            }
            ApiError::UpstreamError(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::StorageError(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidBucket(_) | StoreError::InvalidKey(_) | StoreError::InvalidToken(_) => {
                ApiError::BadRequest(err.to_string())
            }
            StoreError::Io(_) => ApiError::StorageError(err),
        }
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::MissingObject { .. } => ApiError::NotFound(err.to_string()),
            HandlerError::InvalidManifest(_) => ApiError::BadRequest(err.to_string()),
            HandlerError::JobNameReused(_) => ApiError::Conflict(err.to_string()),
            HandlerError::Store(err) => err.into(),
            HandlerError::Fleet(_) => ApiError::UpstreamError(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
