//! Request-boundary errors and their HTTP responses

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::listing::ListingError;
use crate::range::RangeError;
use crate::stream::StreamError;
use crate::token::TokenError;

/// Application error types
///
/// Messages carried here are sent to the client as-is, so they must never
/// contain raw OS error text. Details are logged where the error is built.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
    StorageUnavailable,
    RangeNotSatisfiable(RangeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::StorageUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage unavailable, try again later.".to_string(),
            ),
            AppError::RangeNotSatisfiable(err) => {
                return (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, err.content_range())],
                )
                    .into_response();
            }
        };

        (status, message).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        tracing::debug!("Rejected path token: {}", err);
        AppError::BadRequest("Invalid path token".to_string())
    }
}

impl From<ListingError> for AppError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::NotFound(path) => {
                tracing::debug!("Directory not found: {}", path.display());
                AppError::NotFound("Folder not found".to_string())
            }
            ListingError::Inaccessible { path, source } => {
                tracing::error!("Cannot read {}: {}", path.display(), source);
                AppError::Internal("Drive or Folder not accessible.".to_string())
            }
            ListingError::StorageUnavailable(path) => {
                tracing::warn!("Storage unavailable for {}", path.display());
                AppError::StorageUnavailable
            }
        }
    }
}

impl From<StreamError> for AppError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::NotFound(path) => {
                tracing::debug!("Video not found: {}", path.display());
                AppError::NotFound("File not found".to_string())
            }
            StreamError::Range(err) => AppError::RangeNotSatisfiable(err),
            StreamError::Io { path, source } => {
                tracing::error!("Cannot read {}: {}", path.display(), source);
                AppError::Internal("File not accessible.".to_string())
            }
            StreamError::StorageUnavailable(path) => {
                tracing::warn!("Storage unavailable for {}", path.display());
                AppError::StorageUnavailable
            }
        }
    }
}
