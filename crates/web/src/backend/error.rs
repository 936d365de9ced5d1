//! Backend client errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures reaching or decoding the backend.
///
/// An error HTTP status is *not* a `BackendError`: status and body are
/// relayed as a [`BackendReply`](super::BackendReply) so callers can pass them
/// through verbatim.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout, or similar.
    #[error("Backend unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The backend answered with a body that is not JSON.
    #[error("Backend returned a non-JSON body (status {status})")]
    NonJson { status: StatusCode },
}

impl BackendError {
    /// Status the edge should answer with for this failure.
    ///
    /// Unreachable backends map to 502. A non-JSON body keeps the backend's
    /// error status, or 502 if the backend claimed success.
    #[must_use]
    pub fn edge_status(&self) -> StatusCode {
        match self {
            Self::Unreachable(_) => StatusCode::BAD_GATEWAY,
            Self::NonJson { status } if status.is_client_error() || status.is_server_error() => {
                *status
            }
            Self::NonJson { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Client-safe description of the failure.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unreachable(_) => "Backend service unavailable".to_string(),
            Self::NonJson { status } => {
                format!("Unexpected response from backend (status {})", status.as_u16())
            }
        }
    }
}
