//! Professional profile proxy routes.

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{JsonBody, relay};
use crate::middleware::RequireSession;
use crate::state::AppState;

/// Availability toggle body, forwarded as `{"isAvailable": bool}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityUpdate {
    pub is_available: bool,
}

/// Public profile.
///
/// GET /api/professionals/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    relay(state.backend().professional(&id).await)
}

/// The logged-in professional's full profile.
///
/// GET /api/professionals/me
#[instrument(skip_all)]
pub async fn my_profile(
    State(state): State<AppState>,
    RequireSession(token): RequireSession,
) -> Response {
    relay(state.backend().my_profile(&token).await)
}

/// Update the logged-in professional's profile.
///
/// PUT /api/professionals/me
#[instrument(skip_all)]
pub async fn update_my_profile(
    State(state): State<AppState>,
    RequireSession(token): RequireSession,
    JsonBody(body): JsonBody,
) -> Response {
    relay(state.backend().update_my_profile(&token, &body).await)
}

/// Dashboard statistics.
///
/// GET /api/professionals/me/stats
#[instrument(skip_all)]
pub async fn my_stats(
    State(state): State<AppState>,
    RequireSession(token): RequireSession,
) -> Response {
    relay(state.backend().my_stats(&token).await)
}

/// Set availability.
///
/// PATCH /api/professionals/me/availability
#[instrument(skip(state, token))]
pub async fn set_availability(
    State(state): State<AppState>,
    RequireSession(token): RequireSession,
    JsonBody(update): JsonBody<AvailabilityUpdate>,
) -> Response {
    relay(state.backend().set_availability(&token, &update).await)
}
