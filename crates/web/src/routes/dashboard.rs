//! Professional dashboard.
//!
//! The backend is the source of truth for the session. A 401 from `/me`
//! ends the session at the edge; an unreachable backend falls back to the
//! identity shadow cache so a brief outage does not log anyone out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::instrument;

use proconnect_core::AuthProfessional;
use proconnect_core::guard::LOGIN_PATH;

use super::ErrorTemplate;
use super::api::auth::end_session;
use super::api::professionals::AvailabilityUpdate;
use crate::cookies::clear_session_cookie;
use crate::error;
use crate::middleware::{OptionalSession, RequireSession};
use crate::models::SessionToken;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Availability toggle form data.
#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    pub is_available: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub professional: AuthProfessional,
    /// Rendered from the shadow cache because the backend was unreachable.
    pub stale: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the dashboard.
///
/// GET /dashboard
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    jar: CookieJar,
    RequireSession(token): RequireSession,
) -> Response {
    let fetched = match state.backend().me(&token).await {
        Ok(reply) if reply.status == StatusCode::UNAUTHORIZED => {
            return expire_session(&state, jar, &token);
        }
        Ok(reply) if reply.is_success() => serde_json::from_value::<AuthProfessional>(reply.body)
            .map_err(|e| format!("unexpected profile payload: {e}")),
        Ok(reply) => Err(format!("backend answered {}", reply.status)),
        Err(e) => Err(e.to_string()),
    };

    match fetched {
        Ok(professional) => {
            error::set_sentry_user(&professional.id, Some(&professional.email));
            state.identities().remember(&token, professional.clone());
            DashboardTemplate {
                professional,
                stale: false,
            }
            .into_response()
        }
        Err(reason) => {
            tracing::warn!(reason = %reason, "Could not load professional from backend");
            match state.identities().get(&token) {
                Some(professional) => DashboardTemplate {
                    professional,
                    stale: true,
                }
                .into_response(),
                None => (
                    StatusCode::BAD_GATEWAY,
                    ErrorTemplate {
                        title: "Dashboard unavailable".to_string(),
                        message: "We could not load your profile right now. Please try again in a moment."
                            .to_string(),
                    },
                )
                    .into_response(),
            }
        }
    }
}

/// Toggle availability, then return to the dashboard.
///
/// POST /dashboard/availability
#[instrument(skip_all)]
pub async fn availability(
    State(state): State<AppState>,
    jar: CookieJar,
    RequireSession(token): RequireSession,
    Form(form): Form<AvailabilityForm>,
) -> Response {
    let update = AvailabilityUpdate {
        is_available: form.is_available,
    };

    match state.backend().set_availability(&token, &update).await {
        Ok(reply) if reply.status == StatusCode::UNAUTHORIZED => {
            return expire_session(&state, jar, &token);
        }
        Ok(reply) if reply.is_success() => {
            if let Ok(professional) = serde_json::from_value::<AuthProfessional>(reply.body) {
                state.identities().remember(&token, professional);
            }
        }
        Ok(reply) => {
            tracing::warn!(status = reply.status.as_u16(), "Availability update rejected");
        }
        Err(e) => tracing::warn!(error = %e, "Availability update failed"),
    }

    Redirect::to("/dashboard").into_response()
}

/// Log out from the dashboard form.
///
/// POST /logout
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    OptionalSession(token): OptionalSession,
) -> impl IntoResponse {
    end_session(&state, token.as_ref()).await;
    let jar = jar.add(clear_session_cookie(state.secure_cookies()));
    (jar, Redirect::to("/"))
}

/// The backend no longer accepts the token: drop it and go to login.
fn expire_session(state: &AppState, jar: CookieJar, token: &SessionToken) -> Response {
    tracing::info!("Backend rejected the session token");
    state.identities().forget(token);
    error::clear_sentry_user();
    let jar = jar.add(clear_session_cookie(state.secure_cookies()));
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}
