//! Route guard middleware.
//!
//! Applies [`proconnect_core::guard::evaluate`] to every navigation before
//! it reaches a handler.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use proconnect_core::{GuardDecision, SESSION_COOKIE_NAME, evaluate, guard::DASHBOARD_PATH};

/// Redirect `/dashboard/**` without a session cookie to the login page, and
/// `/login` with one to the dashboard.
pub async fn route_guard_middleware(request: Request, next: Next) -> Response {
    let has_cookie = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE_NAME)
        .is_some_and(|cookie| !cookie.value().trim().is_empty());

    match evaluate(request.uri().path(), has_cookie) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectToLogin { location } => {
            tracing::debug!(path = %request.uri().path(), "Guard: no session, redirecting to login");
            Redirect::to(&location).into_response()
        }
        GuardDecision::RedirectToDashboard => Redirect::to(DASHBOARD_PATH).into_response(),
    }
}
