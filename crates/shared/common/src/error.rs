//! Unified error handling.
//!
//! One error type for every layer of the account service. Backend errors
//! (database, cache) are translated into this taxonomy at the store boundary
//! and never reach a client verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied")]
    Unauthorized,

    // Credential transitions
    #[error("Credentials do not match")]
    CredentialMismatch,

    #[error("New password and confirmation do not match")]
    ConfirmationMismatch,

    #[error("{0}")]
    PolicyViolation(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // Backend errors
    #[error("Service temporarily unavailable")]
    Transient(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    retryable: bool,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::CredentialMismatch => "CREDENTIAL_MISMATCH",
            AppError::ConfirmationMismatch => "CONFIRMATION_MISMATCH",
            AppError::PolicyViolation(_) => "POLICY_VIOLATION",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Transient(_) => "TRANSIENT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::CredentialMismatch
            | AppError::ConfirmationMismatch
            | AppError::PolicyViolation(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Transient(detail) => {
                tracing::warn!("Transient backend failure: {}", detail);
                self.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
                retryable: self.is_retryable(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

// =============================================================================
// Backend Error Conversion
// =============================================================================

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        use sea_orm::{DbErr, RuntimeErr, SqlErr};

        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            tracing::debug!("Unique constraint violation: {}", detail);
            return AppError::Conflict("Record already exists".to_string());
        }

        match &err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => AppError::Transient(err.to_string()),
            DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e))
                if is_serialization_failure(e.as_database_error().and_then(|d| d.code())) =>
            {
                AppError::Transient(err.to_string())
            }
            _ => {
                tracing::error!("Database error: {:?}", err);
                AppError::Internal("A database error occurred".to_string())
            }
        }
    }
}

/// SQLSTATE 40001 (serialization_failure) and 40P01 (deadlock_detected).
#[cfg(feature = "database")]
fn is_serialization_failure(code: Option<std::borrow::Cow<'_, str>>) -> bool {
    matches!(code.as_deref(), Some("40001") | Some("40P01"))
}

#[cfg(feature = "cache")]
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            AppError::Transient(format!("Cache unavailable: {}", err))
        } else {
            tracing::error!("Cache error: {:?}", err);
            AppError::Internal("A cache error occurred".to_string())
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        AppError::PolicyViolation(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        AppError::Transient(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_and_authorization_are_distinct() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_ne!(AppError::Unauthenticated.code(), AppError::Unauthorized.code());
    }

    #[test]
    fn credential_errors_are_client_errors() {
        for err in [
            AppError::CredentialMismatch,
            AppError::ConfirmationMismatch,
            AppError::policy("too short"),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(AppError::transient("pool exhausted").is_retryable());
        assert_eq!(
            AppError::transient("pool exhausted").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(!AppError::internal("boom").is_retryable());
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AppError::internal("relation \"accounts\" does not exist");
        assert_eq!(err.user_message(), "An internal error occurred");

        let err = AppError::transient("connection refused on 10.0.0.4");
        assert!(!err.user_message().contains("10.0.0.4"));
    }

    #[test]
    fn domain_validation_error_keeps_its_message() {
        let err: AppError = DomainError::validation("UserName is required").into();
        assert!(matches!(err, AppError::Validation(msg) if msg == "UserName is required"));

        let err: AppError = DomainError::internal("hash failed").into();
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[cfg(feature = "database")]
    #[test]
    fn connection_failures_are_transient() {
        let err: AppError =
            sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal("refused".to_string())).into();
        assert!(err.is_retryable());

        let err: AppError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
