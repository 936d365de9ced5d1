//! Server-rendered professional login.
//!
//! The `LoginFlow` step machine lives in the flow session. Every post loads
//! it, applies one transition, and persists the in-flight mark before the
//! backend is called, so a duplicate submission from another tab is turned
//! away with 409 instead of reaching the backend twice. A mark older than
//! the configured flow lease is dropped on load.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use proconnect_core::{FlowError, LoginFlow, LoginStep, post_login_target};

use super::api::auth::bridge_session;
use super::flow_status;
use crate::backend::{BackendReply, flow_outcome};
use crate::cookies::session_cookie;
use crate::error::{self, AppError};
use crate::models::session_keys::{LOGIN_FLOW, LOGIN_REDIRECT};
use crate::state::AppState;

const DEFAULT_SENT_MESSAGE: &str = "Code sent";
const NO_SESSION_MESSAGE: &str = "Could not start a session. Please try again.";

// =============================================================================
// Form Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Page to return to after signing in.
    pub redirect: Option<String>,
}

/// Email step form data.
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

/// Code step form data.
#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub otp: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template, one of the email or code steps.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub on_otp_step: bool,
    pub email: String,
    pub otp: String,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl LoginTemplate {
    fn for_flow(flow: &LoginFlow) -> Self {
        match flow.step() {
            LoginStep::Otp { email, message } => Self {
                on_otp_step: true,
                email: email.to_string(),
                otp: String::new(),
                message: Some(message.clone()),
                error: None,
            },
            LoginStep::Email | LoginStep::Authenticated { .. } => Self {
                on_otp_step: false,
                email: String::new(),
                otp: String::new(),
                message: None,
                error: None,
            },
        }
    }

    fn with_email(mut self, email: &str) -> Self {
        if !self.on_otp_step {
            self.email = email.to_string();
        }
        self
    }

    fn with_otp(mut self, otp: &str) -> Self {
        if self.on_otp_step {
            self.otp = otp.to_string();
        }
        self
    }

    fn rejected(mut self, error: &FlowError, message: String) -> Response {
        self.error = Some(message);
        (flow_status(error), self).into_response()
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the session's flow, dropping an in-flight mark left by a request
/// that never finished.
async fn load_flow(state: &AppState, session: &Session) -> Result<LoginFlow, AppError> {
    let mut flow = session
        .get::<LoginFlow>(LOGIN_FLOW)
        .await?
        .unwrap_or_default();
    if flow.release_stale(Utc::now(), state.config().flow_lease()) {
        tracing::warn!("Released a login request that never completed");
    }
    Ok(flow)
}

async fn store_flow(session: &Session, flow: &LoginFlow) -> Result<(), AppError> {
    session.insert(LOGIN_FLOW, flow).await?;
    Ok(())
}

/// Store the flow and flush it to the store before a backend call.
async fn mark_in_flight(session: &Session, flow: &LoginFlow) -> Result<(), AppError> {
    store_flow(session, flow).await?;
    session.save().await?;
    Ok(())
}

async fn discard_flow(session: &Session) -> Result<(), AppError> {
    session.remove::<LoginFlow>(LOGIN_FLOW).await?;
    Ok(())
}

fn sent_message(reply: &BackendReply) -> String {
    reply
        .message()
        .unwrap_or_else(|| DEFAULT_SENT_MESSAGE.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page at the session's current step.
///
/// GET /login?redirect=
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    if let Some(target) = query.redirect.filter(|target| !target.is_empty()) {
        session.insert(LOGIN_REDIRECT, target).await?;
    }

    let flow = load_flow(&state, &session).await?;
    Ok(LoginTemplate::for_flow(&flow).into_response())
}

/// Send a login code to the submitted email.
///
/// POST /login/request-otp
#[instrument(skip_all)]
pub async fn request_otp(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EmailForm>,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session).await?;

    let email = match flow.begin_request_otp(&form.email) {
        Ok(email) => email,
        Err(err) => {
            let message = LoginFlow::request_error_message(&err);
            return Ok(LoginTemplate::for_flow(&flow)
                .with_email(&form.email)
                .rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    error::add_breadcrumb(
        "auth",
        "Login code requested",
        Some(&[("domain", email.domain())]),
    );
    let outcome = flow_outcome(
        state
            .backend()
            .request_otp(&json!({ "email": email.as_str() }))
            .await,
    )
    .map(|reply| sent_message(&reply));

    let result = flow.complete_request_otp(email, outcome);
    store_flow(&session, &flow).await?;

    Ok(match result {
        Ok(()) => LoginTemplate::for_flow(&flow).into_response(),
        Err(err) => {
            let message = LoginFlow::request_error_message(&err);
            LoginTemplate::for_flow(&flow)
                .with_email(&form.email)
                .rejected(&err, message)
        }
    })
}

/// Send a fresh code to the email already in use.
///
/// POST /login/resend
#[instrument(skip_all)]
pub async fn resend(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session).await?;

    let email = match flow.begin_resend() {
        Ok(email) => email,
        Err(err) => {
            let message = LoginFlow::request_error_message(&err);
            return Ok(LoginTemplate::for_flow(&flow).rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    let outcome = flow_outcome(
        state
            .backend()
            .request_otp(&json!({ "email": email.as_str() }))
            .await,
    )
    .map(|reply| sent_message(&reply));

    let result = flow.complete_resend(outcome);
    store_flow(&session, &flow).await?;

    Ok(match result {
        Ok(()) => LoginTemplate::for_flow(&flow).into_response(),
        Err(err) => {
            let message = LoginFlow::request_error_message(&err);
            LoginTemplate::for_flow(&flow).rejected(&err, message)
        }
    })
}

/// Verify the code, set the session cookie and leave for the dashboard.
///
/// POST /login/verify
///
/// A post without a pending challenge in this session is sent back to the
/// email step.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<OtpForm>,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session).await?;

    let (email, code) = match flow.begin_verify(&form.otp) {
        Ok(pair) => pair,
        Err(err @ FlowError::InvalidTransition { .. }) => {
            discard_flow(&session).await?;
            let message = LoginFlow::verify_error_message(&err);
            return Ok(LoginTemplate::for_flow(&LoginFlow::new()).rejected(&err, message));
        }
        Err(err) => {
            let message = LoginFlow::verify_error_message(&err);
            return Ok(LoginTemplate::for_flow(&flow)
                .with_otp(&form.otp)
                .rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    let body = json!({ "email": email.as_str(), "otp": code.as_str() });
    let reply = match flow_outcome(state.backend().verify_otp(&body).await) {
        Ok(reply) => reply,
        Err(err) => {
            let message = LoginFlow::verify_error_message(&err);
            let status = flow_status(&err);
            let _ = flow.complete_verify(Err(err));
            store_flow(&session, &flow).await?;

            let mut page = LoginTemplate::for_flow(&flow).with_otp(&form.otp);
            page.error = Some(message);
            return Ok((status, page).into_response());
        }
    };

    let Some(token) = bridge_session(&state, &reply) else {
        tracing::warn!("Backend verified the code but issued no session token");
        discard_flow(&session).await?;
        let mut page = LoginTemplate::for_flow(&LoginFlow::new()).with_email(email.as_str());
        page.error = Some(NO_SESSION_MESSAGE.to_string());
        return Ok((StatusCode::BAD_GATEWAY, page).into_response());
    };

    flow.complete_verify(Ok(()))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    discard_flow(&session).await?;
    let redirect = session.remove::<String>(LOGIN_REDIRECT).await?;
    let target = post_login_target(redirect.as_deref()).to_string();

    tracing::info!(target = %target, "Professional signed in");
    let jar = jar.add(session_cookie(&token, state.secure_cookies()));
    Ok((jar, Redirect::to(&target)).into_response())
}

/// Go back to the email step.
///
/// POST /login/change-email
///
/// Outside the code step this resets the flow, which also unsticks a flow
/// whose request never completed.
#[instrument(skip_all)]
pub async fn change_email(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session).await?;

    match flow.change_email() {
        Ok(previous) => {
            store_flow(&session, &flow).await?;
            Ok(LoginTemplate::for_flow(&flow)
                .with_email(previous.as_str())
                .into_response())
        }
        Err(_) => {
            discard_flow(&session).await?;
            Ok(LoginTemplate::for_flow(&LoginFlow::new()).into_response())
        }
    }
}
