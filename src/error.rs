//! Error types for the library server

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchPatron = 4,
    NoSuchCopy = 5,
    NoSuchLoan = 6,
    NoSuchData = 7,
    CopyBorrowed = 8,
    Duplicate = 9,
    BadValue = 10,
    HeaderRequired = 11,
    InvalidToken = 12,
    Timeout = 13,
}

/// Coarse classification of every failure the server can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    InvalidInput,
    Dependency,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("An authorization header is required")]
    HeaderRequired,

    #[error("Invalid authorization token: {0}")]
    InvalidToken(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("You are not authorized as a librarian to perform this action")]
    UnauthorizedRole,

    #[error("You are not authorized to perform this action on another patron")]
    UnauthorizedSubject,

    #[error("Unknown patron: {0}")]
    UnknownPatron(String),

    #[error("Unknown book copy: {0}")]
    UnknownCopy(Uuid),

    #[error("No open loan of copy {copy_id} for this patron")]
    NoMatchingLoan { copy_id: Uuid },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book copy {0} is currently being borrowed")]
    CopyAlreadyBorrowed(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store call timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UnknownPatron(_)
            | AppError::UnknownCopy(_)
            | AppError::NoMatchingLoan { .. }
            | AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::CopyAlreadyBorrowed(_) | AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::HeaderRequired
            | AppError::InvalidToken(_)
            | AppError::Authentication(_)
            | AppError::UnauthorizedRole
            | AppError::UnauthorizedSubject => ErrorKind::Unauthorized,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorKind::InvalidInput,
            AppError::Database(_)
            | AppError::Timeout(_)
            | AppError::Internal(_) => ErrorKind::Dependency,
        }
    }

    /// Whether a caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Timeout(_))
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::HeaderRequired => ErrorCode::HeaderRequired,
            AppError::InvalidToken(_) => ErrorCode::InvalidToken,
            AppError::Authentication(_)
            | AppError::UnauthorizedRole
            | AppError::UnauthorizedSubject => ErrorCode::NotAuthorized,
            AppError::UnknownPatron(_) => ErrorCode::NoSuchPatron,
            AppError::UnknownCopy(_) => ErrorCode::NoSuchCopy,
            AppError::NoMatchingLoan { .. } => ErrorCode::NoSuchLoan,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::CopyAlreadyBorrowed(_) => ErrorCode::CopyBorrowed,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Timeout(_) => ErrorCode::Timeout,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid request payload: {}", rejection.body_text()))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(format!("Invalid URL path: {}", rejection.body_text()))
    }
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
        let status = match (&self, self.kind()) {
            (AppError::Timeout(_), _) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Conflict) => StatusCode::CONFLICT,
            (_, ErrorKind::Unauthorized) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::InvalidInput) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Dependency) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let code = self.code();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let copy = Uuid::new_v4();
        assert_eq!(
            AppError::CopyAlreadyBorrowed(copy).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NoMatchingLoan { copy_id: copy }.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UnauthorizedRole.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Timeout(50).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        assert!(!AppError::UnknownPatron("ghost".into()).is_retryable());
        assert!(AppError::Timeout(10).is_retryable());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert_eq!(
            AppError::Database(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Dependency
        );
    }
}
