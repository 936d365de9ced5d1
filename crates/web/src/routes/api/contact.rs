//! Contact-reveal proxy routes.
//!
//! The visitor's IP is forwarded so the backend can apply its per-visitor
//! quota. A 429 from either endpoint is the quota signal and is relayed as-is.
//! A non-numeric professional id is answered locally with a JSON 400.

use axum::{
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use proconnect_core::ProfessionalId;

use super::{JsonBody, relay};
use crate::error::AppError;
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Request a contact-reveal code.
///
/// POST /api/contact/professionals/{id}/request-otp
#[instrument(skip(state, body), fields(professional_id = %id))]
pub async fn request_otp(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<ProfessionalId>, AppError>,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody,
) -> Response {
    relay(
        state
            .backend()
            .request_contact_otp(id, &body, &ip.to_string())
            .await,
    )
}

/// Redeem a contact-reveal code for the professional's contact details.
///
/// POST /api/contact/professionals/{id}/verify-otp
#[instrument(skip(state, body), fields(professional_id = %id))]
pub async fn verify_otp(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<ProfessionalId>, AppError>,
    ClientIp(ip): ClientIp,
    JsonBody(body): JsonBody,
) -> Response {
    relay(
        state
            .backend()
            .verify_contact_otp(id, &body, &ip.to_string())
            .await,
    )
}
