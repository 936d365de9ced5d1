//! Same-origin JSON proxy routes.
//!
//! Handlers forward to the backend and relay its status and JSON body
//! verbatim, error statuses included. Transport failures and unreadable
//! requests become a well-formed `{"error": "..."}` body via [`AppError`].

pub mod auth;
pub mod contact;
pub mod professionals;
pub mod review;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{BackendError, BackendReply};
use crate::error::AppError;

/// JSON request body whose rejection is a JSON error.
///
/// Unlike `axum::Json`, the `Content-Type` header is not checked; only the
/// body has to parse. Malformed JSON is a 400, JSON of the wrong shape a 422.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T = Value>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidInput {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        serde_json::from_slice(&bytes).map(Self).map_err(|e| {
            if e.is_data() {
                AppError::InvalidInput {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    message: format!("Invalid request body: {e}"),
                }
            } else {
                AppError::InvalidInput {
                    status: StatusCode::BAD_REQUEST,
                    message: "Request body must be valid JSON".to_string(),
                }
            }
        })
    }
}

/// Relay a backend answer to the browser unchanged.
pub fn relay(result: Result<BackendReply, BackendError>) -> Response {
    match result {
        Ok(reply) => (reply.status, Json(reply.body)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
