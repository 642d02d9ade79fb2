//! Error handling for the stock ledger service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Reconciliation errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|field| field.to_string())
            .unwrap_or_default();
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        let detail = |code: &str, message: String, field: Option<String>| ErrorDetail {
            code: code.to_string(),
            message,
            field,
        };

        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                detail("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                detail("VALIDATION_ERROR", msg.clone(), None),
            ),
            AppError::DuplicateEntry(resource) => (
                StatusCode::CONFLICT,
                detail(
                    "DUPLICATE_ENTRY",
                    format!("{} already exists", resource),
                    Some(resource.clone()),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                detail("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::Ledger(err) => {
                let code = match err {
                    LedgerError::InvalidQuantity { .. } => "INVALID_QUANTITY",
                    LedgerError::UnscopedMovement { .. } => "UNSCOPED_MOVEMENT",
                    LedgerError::InvalidWindow { .. } => "INVALID_WINDOW",
                    LedgerError::QuantityOverflow { .. } => "QUANTITY_OVERFLOW",
                    LedgerError::PoolCountMismatch { .. } => "POOL_COUNT_MISMATCH",
                    LedgerError::UnknownCategory(_) | LedgerError::InvalidTaxonomy(_) => {
                        "INVALID_TAXONOMY"
                    }
                };
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    detail(code, err.to_string(), None),
                )
            }
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("CONFIGURATION_ERROR", format!("Configuration error: {}", msg), None),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
