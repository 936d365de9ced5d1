//! Review invitation proxy routes.
//!
//! Review links are opened by clients from an email, so the GET never
//! fails: anything other than a JSON answer from the backend is reported as
//! an invalid invitation with HTTP 200.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::instrument;

use super::JsonBody;
use crate::backend::BackendError;
use crate::state::AppState;

/// Invalid-invitation body.
fn invalid(message: &str) -> Value {
    json!({
        "valid": false,
        "professionalName": null,
        "professionalId": null,
        "message": message,
    })
}

fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(serde_json::Map::is_empty)
}

/// Validate a review token.
///
/// GET /api/review/{token}
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let body = match state.backend().review_invitation(&token).await {
        Ok(reply) if is_empty_object(&reply.body) => invalid("Empty response from backend."),
        Ok(reply) => reply.body,
        Err(BackendError::NonJson { .. }) => invalid("Backend returned non-JSON response."),
        Err(e) => {
            tracing::warn!(error = %e, "Review lookup failed");
            invalid("Could not reach the review service.")
        }
    };

    (StatusCode::OK, Json(body)).into_response()
}

/// Submit a review.
///
/// POST /api/review/{token}
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody,
) -> Response {
    match state.backend().submit_review(&token, &body).await {
        Ok(reply) => (reply.status, Json(reply.body)).into_response(),
        Err(BackendError::NonJson { status }) => {
            (status, Json(invalid("Backend returned non-JSON response."))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Review submission failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": format!("Could not reach the server: {e}") })),
            )
                .into_response()
        }
    }
}
