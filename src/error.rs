//! Domain error types for the agency portal.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! Variants follow the workflow error taxonomy: callers of the application
//! workflow only ever see one of these.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required step payload fields are missing or malformed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested workflow step name is not recognized
    #[error("Unknown workflow step: {0}")]
    UnknownStep(String),

    /// A non-creation step was requested without an application id
    #[error("Missing application identity for step '{0}'")]
    MissingIdentity(String),

    /// Edit attempted outside the edit window or after the quote/bind lock
    #[error("Application is immutable: {0}")]
    ImmutableRecord(String),

    /// Relational or document store read/write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Encryption, decryption or hashing failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A child collection item is missing mandatory fields
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Document storage (S3) operation failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnknownStep(_) => "UNKNOWN_STEP",
            AppError::MissingIdentity(_) => "MISSING_IDENTITY",
            AppError::ImmutableRecord(_) => "IMMUTABLE_RECORD",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Crypto(_) => "CRYPTO_ERROR",
            AppError::Mapping(_) => "MAPPING_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, response_message) = match self {
            AppError::Persistence(err_str) | AppError::Storage(err_str) => {
                tracing::error!("Store error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal storage error occurred".to_string(),
                )
            }
            AppError::Crypto(err_str) => {
                tracing::error!("Crypto error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Validation(_)
            | AppError::UnknownStep(_)
            | AppError::MissingIdentity(_)
            | AppError::Mapping(_) => (actix_web::http::StatusCode::BAD_REQUEST, self.to_string()),
            AppError::ImmutableRecord(_) => {
                (actix_web::http::StatusCode::CONFLICT, self.to_string())
            }
            AppError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, self.to_string()),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: response_message,
        })
    }
}

/// Error response body.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("Invalid UUID: {}", err))
    }
}
