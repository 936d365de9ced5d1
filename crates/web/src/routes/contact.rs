//! Contact-reveal modal.
//!
//! One `ContactFlow` per professional is kept in the flow session. Contact
//! details only ever reach a template from the `Done` step, and finishing or
//! closing the modal discards the flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use proconnect_core::{
    ContactFlow, ContactLink, ContactStep, FlowError, ProfessionalContact, ProfessionalId,
};

use super::flow_status;
use crate::backend::flow_outcome;
use crate::error::{self, AppError};
use crate::middleware::ClientIp;
use crate::models::session_keys;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Visitor email form data.
#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

/// Code form data.
#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub otp: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Which part of the modal to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalStep {
    Email,
    Otp,
    Done,
}

/// Contact modal template.
#[derive(Template, WebTemplate)]
#[template(path = "contact_modal.html")]
pub struct ContactModalTemplate {
    pub professional_id: ProfessionalId,
    pub step: ModalStep,
    pub email: String,
    pub otp: String,
    pub error: Option<String>,
    /// Only filled in the `Done` step.
    pub links: Vec<ContactLink>,
}

impl ContactModalTemplate {
    fn for_flow(flow: &ContactFlow) -> Self {
        let (step, email, links) = match flow.step() {
            ContactStep::Email => (ModalStep::Email, String::new(), Vec::new()),
            ContactStep::Otp { email } => (ModalStep::Otp, email.to_string(), Vec::new()),
            ContactStep::Done { contact } => (ModalStep::Done, String::new(), contact.links()),
        };

        Self {
            professional_id: flow.professional_id(),
            step,
            email,
            otp: String::new(),
            error: None,
            links,
        }
    }

    fn with_email(mut self, email: &str) -> Self {
        if self.step == ModalStep::Email {
            self.email = email.to_string();
        }
        self
    }

    fn with_otp(mut self, otp: &str) -> Self {
        if self.step == ModalStep::Otp {
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

async fn load_flow(
    state: &AppState,
    session: &Session,
    id: ProfessionalId,
) -> Result<ContactFlow, AppError> {
    let mut flow = session
        .get::<ContactFlow>(&session_keys::contact_flow(id))
        .await?
        .unwrap_or_else(|| ContactFlow::new(id));
    if flow.release_stale(Utc::now(), state.config().flow_lease()) {
        tracing::warn!(professional_id = %id, "Released a contact request that never completed");
    }
    Ok(flow)
}

async fn store_flow(session: &Session, flow: &ContactFlow) -> Result<(), AppError> {
    session
        .insert(&session_keys::contact_flow(flow.professional_id()), flow)
        .await?;
    Ok(())
}

async fn mark_in_flight(session: &Session, flow: &ContactFlow) -> Result<(), AppError> {
    store_flow(session, flow).await?;
    session.save().await?;
    Ok(())
}

async fn discard_flow(session: &Session, id: ProfessionalId) -> Result<(), AppError> {
    session
        .remove::<ContactFlow>(&session_keys::contact_flow(id))
        .await?;
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Open the modal at the session's current step.
///
/// GET /professionals/{id}/contact
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProfessionalId>,
) -> Result<Response, AppError> {
    let flow = load_flow(&state, &session, id).await?;
    Ok(ContactModalTemplate::for_flow(&flow).into_response())
}

/// Send a contact-reveal code to the visitor.
///
/// POST /professionals/{id}/contact/request-otp
#[instrument(skip(state, session, form))]
pub async fn request_otp(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProfessionalId>,
    ClientIp(ip): ClientIp,
    Form(form): Form<EmailForm>,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session, id).await?;

    let email = match flow.begin_request_otp(&form.email) {
        Ok(email) => email,
        Err(err) => {
            let message = ContactFlow::request_error_message(&err);
            return Ok(ContactModalTemplate::for_flow(&flow)
                .with_email(&form.email)
                .rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    let professional_id = id.to_string();
    error::add_breadcrumb(
        "contact",
        "Contact code requested",
        Some(&[("professional_id", professional_id.as_str())]),
    );
    let outcome = flow_outcome(
        state
            .backend()
            .request_contact_otp(id, &json!({ "email": email.as_str() }), &ip.to_string())
            .await,
    )
    .map(|_| ());

    let result = flow.complete_request_otp(email, outcome);
    store_flow(&session, &flow).await?;

    Ok(match result {
        Ok(()) => ContactModalTemplate::for_flow(&flow).into_response(),
        Err(err) => {
            let message = ContactFlow::request_error_message(&err);
            ContactModalTemplate::for_flow(&flow)
                .with_email(&form.email)
                .rejected(&err, message)
        }
    })
}

/// Send another code to the same email, staying on the code step.
///
/// POST /professionals/{id}/contact/resend
#[instrument(skip(state, session))]
pub async fn resend(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProfessionalId>,
    ClientIp(ip): ClientIp,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session, id).await?;

    let email = match flow.begin_resend() {
        Ok(email) => email,
        Err(err) => {
            let message = ContactFlow::request_error_message(&err);
            return Ok(ContactModalTemplate::for_flow(&flow).rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    let outcome = flow_outcome(
        state
            .backend()
            .request_contact_otp(id, &json!({ "email": email.as_str() }), &ip.to_string())
            .await,
    )
    .map(|_| ());

    let result = flow.complete_resend(outcome);
    store_flow(&session, &flow).await?;

    Ok(match result {
        Ok(()) => ContactModalTemplate::for_flow(&flow).into_response(),
        Err(err) => {
            let message = ContactFlow::request_error_message(&err);
            ContactModalTemplate::for_flow(&flow).rejected(&err, message)
        }
    })
}

/// Redeem the code and disclose the contact details.
///
/// POST /professionals/{id}/contact/verify
#[instrument(skip(state, session, form))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProfessionalId>,
    ClientIp(ip): ClientIp,
    Form(form): Form<OtpForm>,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session, id).await?;

    let (email, code) = match flow.begin_verify(&form.otp) {
        Ok(pair) => pair,
        Err(err) => {
            let message = ContactFlow::verify_error_message(&err);
            return Ok(ContactModalTemplate::for_flow(&flow)
                .with_otp(&form.otp)
                .rejected(&err, message));
        }
    };
    mark_in_flight(&session, &flow).await?;

    let body = json!({ "email": email.as_str(), "otp": code.as_str() });
    let outcome = flow_outcome(
        state
            .backend()
            .verify_contact_otp(id, &body, &ip.to_string())
            .await,
    )
    .and_then(|reply| {
        serde_json::from_value::<ProfessionalContact>(reply.body).map_err(|e| {
            tracing::warn!(error = %e, "Unexpected contact payload");
            FlowError::Transport
        })
    });

    if let Err(err) = flow.complete_verify(outcome) {
        store_flow(&session, &flow).await?;
        let message = ContactFlow::verify_error_message(&err);
        return Ok(ContactModalTemplate::for_flow(&flow)
            .with_otp(&form.otp)
            .rejected(&err, message));
    }

    // Rendered once; reopening the modal starts a fresh flow.
    discard_flow(&session, id).await?;
    tracing::info!(professional_id = %id, "Contact details revealed");
    Ok(ContactModalTemplate::for_flow(&flow).into_response())
}

/// Go back to the email step.
///
/// POST /professionals/{id}/contact/change-email
#[instrument(skip(state, session))]
pub async fn change_email(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProfessionalId>,
) -> Result<Response, AppError> {
    let mut flow = load_flow(&state, &session, id).await?;

    match flow.change_email() {
        Ok(previous) => {
            store_flow(&session, &flow).await?;
            Ok(ContactModalTemplate::for_flow(&flow)
                .with_email(previous.as_str())
                .into_response())
        }
        Err(_) => {
            discard_flow(&session, id).await?;
            Ok(ContactModalTemplate::for_flow(&ContactFlow::new(id)).into_response())
        }
    }
}

/// Close the modal, discarding the flow.
///
/// POST /professionals/{id}/contact/close
#[instrument(skip(session))]
pub async fn close(
    session: Session,
    Path(id): Path<ProfessionalId>,
) -> Result<Response, AppError> {
    discard_flow(&session, id).await?;
    Ok(Redirect::to(&format!("/professionals/{id}")).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn flow_at_otp() -> ContactFlow {
        let mut flow = ContactFlow::new(ProfessionalId::new(4));
        let email = flow.begin_request_otp("visitor@example.com").unwrap();
        flow.complete_request_otp(email, Ok(())).unwrap();
        flow
    }

    fn revealed(contact: ProfessionalContact) -> ContactFlow {
        let mut flow = flow_at_otp();
        flow.begin_verify("123456").unwrap();
        flow.complete_verify(Ok(contact)).unwrap();
        flow
    }

    #[test]
    fn test_empty_contact_renders_placeholder() {
        let html = ContactModalTemplate::for_flow(&revealed(ProfessionalContact::default()))
            .render()
            .unwrap();
        assert!(html.contains("No contact details available."));
        assert!(!html.contains("mailto:"));
    }

    #[test]
    fn test_links_render_only_when_done() {
        let contact = ProfessionalContact {
            email: Some("pro@example.com".to_string()),
            phone: Some("+1 (555) 123-4567".to_string()),
            whatsapp: Some("+1 (555) 123-4567".to_string()),
        };
        let html = ContactModalTemplate::for_flow(&revealed(contact))
            .render()
            .unwrap();
        assert!(html.contains("href=\"mailto:pro@example.com\""));
        assert!(html.contains("href=\"https://wa.me/15551234567\""));

        let html = ContactModalTemplate::for_flow(&flow_at_otp())
            .render()
            .unwrap();
        assert!(!html.contains("mailto:"));
        assert!(html.contains("action=\"/professionals/4/contact/verify\""));
    }

    #[test]
    fn test_quota_copy_with_status() {
        let err = FlowError::from_status(429, None);
        let response = ContactModalTemplate::for_flow(&flow_at_otp())
            .rejected(&err, ContactFlow::verify_error_message(&err));
        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_email_prefill_only_on_email_step() {
        let page = ContactModalTemplate::for_flow(&ContactFlow::new(ProfessionalId::new(4)))
            .with_email("typed@example.com");
        assert_eq!(page.email, "typed@example.com");

        let page = ContactModalTemplate::for_flow(&flow_at_otp()).with_email("typed@example.com");
        assert_eq!(page.email, "visitor@example.com");
    }
}
