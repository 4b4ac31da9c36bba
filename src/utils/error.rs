use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Another buyer got there first: seats, voucher slots or coupons
    /// ran out between read and write. Safe to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The transaction is not in a status that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidStateTransition(String),

    /// A deadline passed: payment window, voucher window, coupon or
    /// event end.
    #[error("Expired: {0}")]
    Expired(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// A guarded write missed under a held row lock, i.e. the stored
    /// state no longer matches what the transaction row claims. The
    /// enclosing unit aborts; nothing partial persists.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidStateTransition(_) => StatusCode::CONFLICT,
            AppError::Expired(_) => StatusCode::GONE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidStateTransition(_) => "INVALID_STATE",
            AppError::Expired(_) => "EXPIRED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a client may simply retry the same request. True only
    /// for contention losses; state errors will fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// True when the wrapped database error is a unique-constraint hit,
    /// which callers inserting caller-supplied codes surface as a
    /// `Conflict` rather than a 500.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }

    fn log(&self) {
        match self {
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::Internal(msg) => {
                error!(message = %msg, "Invariant breach, unit aborted");
            }
            AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Contention loss");
            }
            _ => {
                warn!(code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::PermissionDenied(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidStateTransition(msg)
            | AppError::Expired(msg) => msg.clone(),
            AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_distinguish_contention_from_state() {
        assert_eq!(
            AppError::Conflict("seats".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidStateTransition("already done".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Expired("deadline passed".into()).status_code(),
            StatusCode::GONE
        );
    }

    #[test]
    fn only_contention_losses_are_retryable() {
        assert!(AppError::Conflict("seats".into()).is_retryable());
        assert!(!AppError::InvalidStateTransition("done".into()).is_retryable());
        assert!(!AppError::Expired("gone".into()).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
    }
}
