//! HTTP route handlers for the edge.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to the login page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachable)
//!
//! # Login (server-rendered, flow kept in the flow session)
//! GET  /login?redirect=        - Current login step
//! POST /login/request-otp      - Send a login code (rate limited)
//! POST /login/resend           - Send another code (rate limited)
//! POST /login/verify           - Verify the code, set the session cookie
//! POST /login/change-email     - Back to the email step
//!
//! # Dashboard (guarded by session cookie presence)
//! GET  /dashboard              - Profile and availability
//! POST /dashboard/availability - Toggle availability
//! POST /logout                 - Log out, back to /
//!
//! # Public profile and contact reveal
//! GET  /professionals/{id}                      - Profile page
//! GET  /professionals/{id}/contact              - Contact modal
//! POST /professionals/{id}/contact/request-otp  - Send a contact code (rate limited)
//! POST /professionals/{id}/contact/resend       - Send another code (rate limited)
//! POST /professionals/{id}/contact/verify       - Reveal the contact details
//! POST /professionals/{id}/contact/change-email - Back to the email step
//! POST /professionals/{id}/contact/close        - Discard the flow
//!
//! # Same-origin JSON proxy
//! POST /api/auth/request-otp                         (rate limited)
//! POST /api/auth/verify-otp                          - Bridges the session cookie
//! GET  /api/auth/me
//! POST /api/auth/logout                              - Always clears the cookie
//! POST /api/contact/professionals/{id}/request-otp   (rate limited)
//! POST /api/contact/professionals/{id}/verify-otp
//! GET  /api/professionals/me, PUT /api/professionals/me
//! GET  /api/professionals/me/stats
//! PATCH /api/professionals/me/availability
//! GET  /api/professionals/{id}
//! GET  /api/review/{token}, POST /api/review/{token}
//! ```

pub mod api;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod login;
pub mod professionals;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::Redirect,
    routing::{get, patch, post},
};

use proconnect_core::FlowError;
use proconnect_core::guard::LOGIN_PATH;

use crate::middleware::otp_rate_limiter;
use crate::state::AppState;

/// Generic error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
}

/// Status for a form post rejected with `error`.
pub(crate) fn flow_status(error: &FlowError) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Routes that make the backend send an email.
///
/// These are the only routes behind the edge rate limiter, and only when
/// `rate_limit` is on.
pub fn otp_issuing_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/login/request-otp", post(login::request_otp))
        .route("/login/resend", post(login::resend))
        .route(
            "/professionals/{id}/contact/request-otp",
            post(contact::request_otp),
        )
        .route("/professionals/{id}/contact/resend", post(contact::resend))
        .route("/api/auth/request-otp", post(api::auth::request_otp))
        .route(
            "/api/contact/professionals/{id}/request-otp",
            post(api::contact::request_otp),
        );

    if rate_limit {
        router.layer(otp_rate_limiter())
    } else {
        router
    }
}

/// Server-rendered login, dashboard and contact pages.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to(LOGIN_PATH) }))
        .route("/login", get(login::login_page))
        .route("/login/verify", post(login::verify))
        .route("/login/change-email", post(login::change_email))
        .route("/dashboard", get(dashboard::show))
        .route("/dashboard/availability", post(dashboard::availability))
        .route("/logout", post(dashboard::logout))
        .route("/professionals/{id}", get(professionals::show))
        .route("/professionals/{id}/contact", get(contact::show))
        .route("/professionals/{id}/contact/verify", post(contact::verify))
        .route(
            "/professionals/{id}/contact/change-email",
            post(contact::change_email),
        )
        .route("/professionals/{id}/contact/close", post(contact::close))
}

/// Same-origin JSON proxy routes, mounted at `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/verify-otp", post(api::auth::verify_otp))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/logout", post(api::auth::logout))
        .route(
            "/contact/professionals/{id}/verify-otp",
            post(api::contact::verify_otp),
        )
        .route(
            "/professionals/me",
            get(api::professionals::my_profile).put(api::professionals::update_my_profile),
        )
        .route("/professionals/me/stats", get(api::professionals::my_stats))
        .route(
            "/professionals/me/availability",
            patch(api::professionals::set_availability),
        )
        .route("/professionals/{id}", get(api::professionals::show))
        .route(
            "/review/{token}",
            get(api::review::show).post(api::review::submit),
        )
}

/// Create all routes for the edge.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(page_routes())
        .merge(otp_issuing_routes(rate_limit))
        .nest("/api", api_routes())
}
