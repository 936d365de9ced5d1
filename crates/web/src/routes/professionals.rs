//! Public professional profile page, the host of the contact modal.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use proconnect_core::ProfessionalId;

use super::ErrorTemplate;
use crate::state::AppState;

/// The slice of the public profile the page shows.
///
/// Contact channels are left out; only the contact modal discloses them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub display_name: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub is_available: bool,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "professional.html")]
pub struct ProfessionalTemplate {
    pub id: ProfessionalId,
    pub profile: PublicProfile,
}

/// Display a professional's public profile.
///
/// GET /professionals/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<ProfessionalId>) -> Response {
    let reply = match state.backend().professional(&id.to_string()).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load professional");
            return unavailable(StatusCode::BAD_GATEWAY);
        }
    };

    if reply.status == StatusCode::NOT_FOUND {
        return (
            StatusCode::NOT_FOUND,
            ErrorTemplate {
                title: "Professional not found".to_string(),
                message: "This profile does not exist or is no longer listed.".to_string(),
            },
        )
            .into_response();
    }
    if !reply.is_success() {
        tracing::warn!(status = reply.status.as_u16(), "Backend rejected profile lookup");
        return unavailable(reply.status);
    }

    match serde_json::from_value::<PublicProfile>(reply.body) {
        Ok(profile) => ProfessionalTemplate { id, profile }.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Unexpected profile payload");
            unavailable(StatusCode::BAD_GATEWAY)
        }
    }
}

fn unavailable(status: StatusCode) -> Response {
    (
        status,
        ErrorTemplate {
            title: "Profile unavailable".to_string(),
            message: "We could not load this profile right now. Please try again.".to_string(),
        },
    )
        .into_response()
}
