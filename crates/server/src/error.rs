//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tradewind_core::checkout::OrderError;
use tradewind_core::gate::GateError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Authorization gate rejected the request.
    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body or parameters failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status_code();
        let message = self.client_message();

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => !matches!(
                err,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Gate(GateError::Directory(_)) | Self::Internal(_) => true,
            Self::Order(OrderError::Store(_)) => true,
            Self::Auth(AuthError::Repository(_) | AuthError::Hashing | AuthError::TokenIssue) => true,
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::AccountNotActive(_) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AuthError::Repository(_) | AuthError::Hashing | AuthError::TokenIssue => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Gate(err) => {
                if err.is_unauthenticated() {
                    StatusCode::UNAUTHORIZED
                } else if matches!(err, GateError::Directory(_)) {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::FORBIDDEN
                }
            }
            Self::Order(err) => match err {
                OrderError::EmptyTrolley
                | OrderError::InsufficientStock(_)
                | OrderError::AddressNotOwned(_) => StatusCode::CONFLICT,
                OrderError::AddressNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients. Internal details stay in logs.
    fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::AccountNotActive(_) => {
                    "Invalid credentials".to_string()
                }
                AuthError::EmailTaken => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) | AuthError::Hashing | AuthError::TokenIssue => {
                    "Internal server error".to_string()
                }
            },
            Self::Gate(err) => match err {
                GateError::Directory(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Order(err) => match err {
                OrderError::Store(_) => "Internal server error".to_string(),
                OrderError::AddressNotFound(_) => "Address not found".to_string(),
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with accounts.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewind_core::ProductId;

    #[test]
    fn gate_rejections_split_401_and_403() {
        let unauthenticated = AppError::Gate(GateError::TokenExpired);
        assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden = AppError::Gate(GateError::RoleInsufficient {
            held: tradewind_core::Role::Customer,
        });
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn stock_shortfall_is_a_conflict() {
        let err = AppError::Order(OrderError::InsufficientStock(ProductId::new(7)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!err.is_server_error());
    }

    #[test]
    fn database_failures_hide_details() {
        let err = AppError::Internal("pool exhausted".to_string());
        assert!(err.is_server_error());
        assert_eq!(err.client_message(), "Internal server error");
    }
}
