//! Unified error handling with Sentry integration.
//!
//! `AppError` captures server-side failures to Sentry before responding and
//! always answers with a well-formed JSON body: `{"error": "..."}`.

use axum::{
    Json,
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;

/// Application-level error type for the edge.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend unreachable or answered with something other than JSON.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Flow session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request could not be read (bad JSON body, bad path parameter).
    #[error("Invalid input: {message}")]
    InvalidInput { status: StatusCode, message: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => err.edge_status(),
            Self::InvalidInput { status, .. } => *status,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Backend(err) => err.public_message(),
            Self::InvalidInput { message, .. } => message.clone(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Session(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Backend(_)) {
            tracing::warn!(error = %self, "Backend request failed");
        } else {
            tracing::debug!(error = %self, "Rejected request");
        }

        let status = self.status();
        // Don't expose internal error details to clients
        let body = json!({ "error": self.public_message() });

        (status, Json(body)).into_response()
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidInput {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Set the Sentry user context from a professional ID.
///
/// Call this after the backend confirms the session so errors are
/// associated with the professional.
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
/// Call this on logout to stop associating errors with the professional.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a flow step.
///
/// Never pass OTP codes or tokens as data.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Internal("flow left in an unexpected step".to_string());
        assert_eq!(err.to_string(), "Internal error: flow left in an unexpected step");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Backend(BackendError::NonJson {
                status: StatusCode::SERVICE_UNAVAILABLE
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invalid_input_is_shown_with_its_status() {
        let err = AppError::InvalidInput {
            status: StatusCode::BAD_REQUEST,
            message: "Request body must be valid JSON".to_string(),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Request body must be valid JSON");
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = AppError::Internal("connection pool exhausted".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
