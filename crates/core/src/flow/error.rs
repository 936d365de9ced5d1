//! Error taxonomy shared by the login and contact-reveal flows.
//!
//! Classification is driven by HTTP status, never by backend message text.
//! Every variant leaves its flow in a re-enterable state.

use crate::types::{EmailError, OtpCodeError};

/// Generic copy for transport and server failures.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Why a flow operation did not advance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Input rejected locally; the network was never touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend answered 429. Recoverable later.
    #[error("rate limited")]
    RateLimited {
        /// Backend-supplied message, if any.
        message: Option<String>,
    },

    /// Backend rejected the request or code (any other 4xx). Recoverable now.
    #[error("rejected by backend")]
    Verification {
        /// Backend-supplied message, if any.
        message: Option<String>,
    },

    /// Backend answered with a 5xx status.
    #[error("backend server error")]
    Server {
        /// Backend-supplied message, if any.
        message: Option<String>,
    },

    /// The backend could not be reached or answered with a non-JSON body.
    #[error("backend unavailable")]
    Transport,

    /// No valid session. Drives logged-out UI rather than an error banner.
    #[error("not authenticated")]
    Unauthenticated,

    /// A request for this flow is already pending.
    #[error("a request is already in progress")]
    InFlight,

    /// The operation is not legal in the flow's current step.
    #[error("cannot {operation} from the {step} step")]
    InvalidTransition {
        /// Operation that was attempted.
        operation: &'static str,
        /// Step the flow was in.
        step: &'static str,
    },
}

impl FlowError {
    /// Classify a non-success backend status.
    ///
    /// 429 is a quota/rate limit, any other 4xx is a rejection the user can
    /// correct, and everything else is a server failure. The backend message
    /// is kept in every case.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            429 => Self::RateLimited { message },
            400..=499 => Self::Verification { message },
            _ => Self::Server { message },
        }
    }

    /// HTTP status to answer a form post with when this error is rendered.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::RateLimited { .. } => 429,
            Self::Verification { .. } => 400,
            Self::Server { .. } | Self::Transport => 502,
            Self::Unauthenticated => 401,
            Self::InFlight | Self::InvalidTransition { .. } => 409,
        }
    }

    /// Whether the condition clears on its own with time.
    #[must_use]
    pub const fn is_recoverable_later(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Backend message carried by the error, if any.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::RateLimited { message }
            | Self::Verification { message }
            | Self::Server { message } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<EmailError> for FlowError {
    fn from(_: EmailError) -> Self {
        Self::Validation("Please enter a valid email address.".to_string())
    }
}

impl From<OtpCodeError> for FlowError {
    fn from(_: OtpCodeError) -> Self {
        Self::Validation("Please enter the 6-digit code.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_by_code() {
        assert_eq!(
            FlowError::from_status(429, None),
            FlowError::RateLimited { message: None }
        );
        assert_eq!(
            FlowError::from_status(400, Some("Invalid OTP".to_string())),
            FlowError::Verification {
                message: Some("Invalid OTP".to_string())
            }
        );
        assert_eq!(
            FlowError::from_status(401, None),
            FlowError::Verification { message: None }
        );
        assert_eq!(
            FlowError::from_status(500, None),
            FlowError::Server { message: None }
        );
    }

    #[test]
    fn test_server_error_keeps_backend_message() {
        let err = FlowError::from_status(503, Some("Maintenance until 02:00".to_string()));
        assert_eq!(err.backend_message(), Some("Maintenance until 02:00"));
        assert_eq!(err.status_code(), 502);
        assert!(FlowError::Transport.backend_message().is_none());
    }

    #[test]
    fn test_only_rate_limit_is_recoverable_later() {
        assert!(FlowError::RateLimited { message: None }.is_recoverable_later());
        assert!(!FlowError::Verification { message: None }.is_recoverable_later());
        assert!(!FlowError::Transport.is_recoverable_later());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FlowError::Validation(String::new()).status_code(), 422);
        assert_eq!(FlowError::InFlight.status_code(), 409);
        assert_eq!(FlowError::Transport.status_code(), 502);
    }
}
