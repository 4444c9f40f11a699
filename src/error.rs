//! Error types for Bookkeep server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Stable error codes reported to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    InsufficientBalance = 10,
    CategoryLimitExceeded = 11,
    OutstandingOverdueLock = 12,
    OutOfCapacity = 13,
    BookAmountLimit = 14,
}

/// Business-rule rejections of a borrow or sale request.
///
/// These are expected outcomes, not failures: each one tells the caller
/// exactly which rule refused the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LendingRejection {
    #[error("Insufficient account balance (balance {balance}, required {required})")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    #[error("Category limit reached ({active}/{limit} active loans in category {category_id})")]
    CategoryLimitExceeded {
        category_id: i32,
        active: usize,
        limit: i32,
    },

    #[error("User has undelivered overdue book(s)")]
    OutstandingOverdueLock,

    #[error("Target books have been rented: out of capacity")]
    OutOfCapacity,

    #[error("No copies of the book left to sell")]
    BookAmountLimit,
}

impl LendingRejection {
    pub fn code(&self) -> ErrorCode {
        match self {
            LendingRejection::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            LendingRejection::CategoryLimitExceeded { .. } => ErrorCode::CategoryLimitExceeded,
            LendingRejection::OutstandingOverdueLock => ErrorCode::OutstandingOverdueLock,
            LendingRejection::OutOfCapacity => ErrorCode::OutOfCapacity,
            LendingRejection::BookAmountLimit => ErrorCode::BookAmountLimit,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Request rejected: {0}")]
    Rejected(#[from] LendingRejection),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) | AppError::DataIntegrity(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Rejected(rejection) => {
                (StatusCode::BAD_REQUEST, rejection.code(), rejection.to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
