//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and logged before the client gets a generic message in
//! the standard `{ "success": false, "message": … }` envelope.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::response::ApiResponse;
use crate::services::{AuthError, CommerceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule or storage failure from a service.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Commerce(err) => match err {
                CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                CommerceError::InvalidQuantity(_)
                | CommerceError::InsufficientStock { .. }
                | CommerceError::EmptyCart
                | CommerceError::ProductUnavailable { .. }
                | CommerceError::InvalidTransition { .. }
                | CommerceError::Validation(_) => StatusCode::BAD_REQUEST,
                CommerceError::Forbidden => StatusCode::FORBIDDEN,
                CommerceError::AlreadyExists(_) => StatusCode::CONFLICT,
                CommerceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is our fault rather than the client's.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Commerce(CommerceError::StorageUnavailable(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Session(_)
                | Self::Internal(_)
        )
    }

    /// Client-facing message; never includes internal details.
    fn client_message(&self) -> String {
        match self {
            Self::Commerce(CommerceError::StorageUnavailable(_))
            | Self::Auth(AuthError::Repository(_)) => {
                "Service temporarily unavailable".to_string()
            }
            Self::Commerce(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::MissingField(_) => err.to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
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

        (self.status(), ApiResponse::error(self.client_message())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use cartline_core::OrderStatus;

    use super::*;
    use crate::db::RepositoryError;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_commerce_error_status_codes() {
        assert_eq!(status(CommerceError::NotFound("cart")), StatusCode::NOT_FOUND);
        assert_eq!(status(CommerceError::InvalidQuantity(0)), StatusCode::BAD_REQUEST);
        assert_eq!(status(CommerceError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CommerceError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(CommerceError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status(CommerceError::AlreadyExists("sku".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CommerceError::StorageUnavailable(RepositoryError::NotFound)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            status(AuthError::WeakPassword("short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AuthError::PasswordHash), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(CommerceError::StorageUnavailable(
            RepositoryError::DataCorruption("bad row 17".to_string()),
        ));
        assert_eq!(err.client_message(), "Service temporarily unavailable");

        let err = AppError::Internal("pool exhausted".to_string());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_business_messages_are_shown() {
        let err = AppError::from(CommerceError::InsufficientStock {
            name: "Widget".to_string(),
            available: 3,
            requested: 5,
        });
        assert_eq!(
            err.client_message(),
            "insufficient stock for Widget: 3 available, 5 requested"
        );
        assert_eq!(
            AppError::Unauthorized("Authentication required".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
