//! Error types for the resource cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::MessageResponse;

// == Cache Error Enum ==
/// Unified error type for the resource cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Requested resource is absent from the blob cache
    #[error("Resource not cached: {0}")]
    NotCached(String),

    /// Durable key-value store read or write failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Blob cache put, match or delete failed
    #[error("Blob cache failure: {0}")]
    Blob(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// HTTP status used when this error reaches the message layer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotCached(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Persistence(_) | CacheError::Blob(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let body = Json(MessageResponse::failure(self.to_string()));

        (self.status_code(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resource cache.
pub type Result<T> = std::result::Result<T, CacheError>;
