//! Unified Error Handling
//!
//! Provides a consistent error type hierarchy for the adaptive learning
//! backend, matching the HTTP status/code mapping in the external
//! interfaces.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Transient storage failures; caller may retry.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Not found errors
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rating outside {1,2,3,4}. Programmer error, fatal to the one item.
    #[error("invalid rating: {0}")]
    InvalidRating(i32),

    /// A session, placement or review, refers to an item that doesn't exist.
    #[error("unknown item: {id}")]
    UnknownItem { id: String },

    /// Placement session missing, already complete, or owned by another learner.
    #[error("placement session unavailable: {id}")]
    SessionUnavailable { id: String },

    /// No candidate items carry a theta_item at session start.
    #[error("no placement items available")]
    NoPlacementItems,

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code for client handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Some("STORAGE_UNAVAILABLE"),
                    "A storage error occurred".to_string(),
                )
            }
            AppError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                Some("NOT_FOUND"),
                format!("{} with id '{}' not found", resource, id),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Some("VALIDATION_ERROR"),
                msg.clone(),
            ),
            AppError::InvalidRating(rating) => (
                StatusCode::BAD_REQUEST,
                Some("INVALID_RATING"),
                format!("rating {} is not in 1..=4", rating),
            ),
            AppError::UnknownItem { id } => (
                StatusCode::NOT_FOUND,
                Some("UNKNOWN_ITEM"),
                format!("item '{}' does not exist", id),
            ),
            AppError::SessionUnavailable { id } => (
                StatusCode::CONFLICT,
                Some("SESSION_UNAVAILABLE"),
                format!("placement session '{}' is unavailable", id),
            ),
            AppError::NoPlacementItems => (
                StatusCode::NOT_FOUND,
                Some("NO_PLACEMENT_ITEMS"),
                "no placement items available for this language".to_string(),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Some("INTERNAL_ERROR"),
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.map(String::from),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversion from anyhow::Error
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
#[allow(dead_code)]
pub trait OptionExt<T> {
    fn ok_or_not_found(self, resource: &'static str, id: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, resource: &'static str, id: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound {
            resource,
            id: id.into(),
        })
    }
}
