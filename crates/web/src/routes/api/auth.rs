//! Auth proxy routes with cookie bridging.
//!
//! The backend issues the session cookie for its own domain. `verify-otp`
//! lifts the token out of the backend `Set-Cookie` and re-issues it for the
//! edge domain; `logout` always clears it.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::{Value, json};
use tracing::instrument;

use proconnect_core::{AuthProfessional, SESSION_COOKIE_NAME, extract_cookie_value};

use super::{JsonBody, relay};
use crate::backend::BackendReply;
use crate::cookies::{clear_session_cookie, session_cookie};
use crate::error::{self, AppError};
use crate::middleware::OptionalSession;
use crate::models::SessionToken;
use crate::state::AppState;

/// Request a login code.
///
/// POST /api/auth/request-otp
#[instrument(skip_all)]
pub async fn request_otp(State(state): State<AppState>, JsonBody(body): JsonBody) -> Response {
    relay(state.backend().request_otp(&body).await)
}

/// Verify a login code and bridge the session cookie.
///
/// POST /api/auth/verify-otp
///
/// A success without a usable `Set-Cookie` still relays the body; the
/// browser simply ends up without a session.
#[instrument(skip_all)]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let reply = state.backend().verify_otp(&body).await?;

    if !reply.is_success() {
        return Ok((reply.status, Json(reply.body)).into_response());
    }

    let Some(token) = bridge_session(&state, &reply) else {
        tracing::warn!("Backend verified the code but issued no session token");
        return Ok((reply.status, Json(reply.body)).into_response());
    };

    let jar = jar.add(session_cookie(&token, state.secure_cookies()));
    Ok((jar, (reply.status, Json(reply.body))).into_response())
}

/// Lift the session token out of a successful verification reply.
///
/// Caches the returned identity and tags the Sentry scope with it when the
/// body parses. Returns `None` if the backend issued no usable token.
pub fn bridge_session(state: &AppState, reply: &BackendReply) -> Option<SessionToken> {
    let token = extract_cookie_value(
        reply.set_cookies.iter().map(String::as_str),
        SESSION_COOKIE_NAME,
    )
    .and_then(SessionToken::new)?;

    if let Ok(professional) = serde_json::from_value::<AuthProfessional>(reply.body.clone()) {
        error::set_sentry_user(&professional.id, Some(&professional.email));
        state.identities().remember(&token, professional);
    }

    Some(token)
}

/// Current professional, or `401 null`.
///
/// GET /api/auth/me
#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    OptionalSession(token): OptionalSession,
) -> Result<Response, AppError> {
    let Some(token) = token else {
        return Ok(unauthenticated());
    };

    let reply = state.backend().me(&token).await?;
    if !reply.is_success() {
        return Ok(unauthenticated());
    }

    if let Ok(professional) = serde_json::from_value::<AuthProfessional>(reply.body.clone()) {
        state.identities().remember(&token, professional);
    }

    Ok((StatusCode::OK, Json(reply.body)).into_response())
}

/// Log out. Never fails; the cookie is always cleared.
///
/// POST /api/auth/logout
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    OptionalSession(token): OptionalSession,
) -> impl IntoResponse {
    end_session(&state, token.as_ref()).await;
    let jar = jar.add(clear_session_cookie(state.secure_cookies()));
    (jar, Json(json!({ "message": "Logged out" })))
}

/// Forget the cached identity, then tell the backend best-effort.
///
/// The cache entry is dropped before the network call so nothing can render
/// the old identity while the backend is being informed.
pub async fn end_session(state: &AppState, token: Option<&SessionToken>) {
    if let Some(token) = token {
        state.identities().forget(token);
    }
    error::clear_sentry_user();

    match state.backend().logout(token).await {
        Ok(reply) if !reply.is_success() => {
            tracing::warn!(status = reply.status.as_u16(), "Backend logout rejected");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Backend logout failed"),
    }
}

fn unauthenticated() -> Response {
    (StatusCode::UNAUTHORIZED, Json(Value::Null)).into_response()
}
