//! Contact-reveal flow: email -> OTP -> contact details shown.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FlowError, GENERIC_FAILURE_MESSAGE};
use super::pending::Pending;
use crate::types::{Email, OtpCode, ProfessionalContact, ProfessionalId};

/// Copy shown whenever the backend reports the view quota is used up.
pub const QUOTA_EXCEEDED_MESSAGE: &str = "You have reached the contact view limit for this \
professional (2 views per 24 hours). Please try again in 24 hours.";

const SEND_FAILED_MESSAGE: &str = "Failed to send verification code. Please try again.";
const INVALID_CODE_MESSAGE: &str = "Invalid or expired code. Please try again.";

/// Where a contact-reveal flow currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ContactStep {
    /// Collecting the visitor's email.
    #[default]
    Email,
    /// A code was sent to `email`.
    Otp { email: Email },
    /// The code was accepted; contact details are disclosed.
    Done { contact: ProfessionalContact },
}

impl ContactStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Otp { .. } => "otp",
            Self::Done { .. } => "done",
        }
    }
}

/// Contact-reveal step machine for one professional and one modal session.
///
/// `Done` is only reachable from `Otp` through a successful
/// [`complete_verify`](Self::complete_verify), which is the only place a
/// [`ProfessionalContact`] enters the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlow {
    professional_id: ProfessionalId,
    step: ContactStep,
    #[serde(default)]
    in_flight: Pending,
}

impl ContactFlow {
    /// Open a fresh flow for a professional.
    #[must_use]
    pub fn new(professional_id: ProfessionalId) -> Self {
        Self {
            professional_id,
            step: ContactStep::Email,
            in_flight: Pending::default(),
        }
    }

    /// Professional this flow reveals.
    #[must_use]
    pub const fn professional_id(&self) -> ProfessionalId {
        self.professional_id
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> &ContactStep {
        &self.step
    }

    /// Whether a backend call for this flow is pending.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_set()
    }

    /// Drop an in-flight mark older than `lease`. Returns whether one was
    /// dropped.
    pub fn release_stale(&mut self, now: DateTime<Utc>, lease: TimeDelta) -> bool {
        self.in_flight.release_if_stale(now, lease)
    }

    /// Visitor email for the pending challenge.
    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        match &self.step {
            ContactStep::Otp { email } => Some(email),
            _ => None,
        }
    }

    /// Revealed contact details, only in the `Done` step.
    #[must_use]
    pub fn contact(&self) -> Option<&ProfessionalContact> {
        match &self.step {
            ContactStep::Done { contact } => Some(contact),
            _ => None,
        }
    }

    /// Validate the visitor email and mark a code request as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the email step, `InFlight` if a request
    /// is pending, `Validation` for a malformed address.
    pub fn begin_request_otp(&mut self, raw_email: &str) -> Result<Email, FlowError> {
        self.expect_email_step("request a code")?;
        self.ensure_idle()?;
        let email = Email::parse(raw_email)?;
        self.in_flight.start();
        Ok(email)
    }

    /// Apply the backend answer to a code request.
    ///
    /// # Errors
    ///
    /// The backend error (the flow stays on the email step), or
    /// `InvalidTransition` if no request was pending.
    pub fn complete_request_otp(
        &mut self,
        email: Email,
        outcome: Result<(), FlowError>,
    ) -> Result<(), FlowError> {
        self.expect_email_step("finish a code request")?;
        self.finish_pending("finish a code request")?;
        outcome?;
        self.step = ContactStep::Otp { email };
        Ok(())
    }

    /// Mark a resend for the current email as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step, `InFlight` if a request is
    /// pending.
    pub fn begin_resend(&mut self) -> Result<Email, FlowError> {
        let email = self.otp_email("resend a code")?;
        self.ensure_idle()?;
        self.in_flight.start();
        Ok(email)
    }

    /// Apply the backend answer to a resend. The flow stays on the OTP step
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// The backend error, or `InvalidTransition` if no resend was pending.
    pub fn complete_resend(&mut self, outcome: Result<(), FlowError>) -> Result<(), FlowError> {
        self.otp_email("finish a resend")?;
        self.finish_pending("finish a resend")?;
        outcome
    }

    /// Validate the code and mark verification as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step, `InFlight` if a request is
    /// pending, `Validation` unless exactly six digits remain after
    /// sanitizing.
    pub fn begin_verify(&mut self, raw_code: &str) -> Result<(Email, OtpCode), FlowError> {
        let email = self.otp_email("verify a code")?;
        self.ensure_idle()?;
        let code = OtpCode::parse(raw_code)?;
        self.in_flight.start();
        Ok((email, code))
    }

    /// Apply the backend answer to a verification, disclosing the contact
    /// details on success.
    ///
    /// # Errors
    ///
    /// The backend error (the flow stays on the OTP step for retry), or
    /// `InvalidTransition` if no verification was pending.
    pub fn complete_verify(
        &mut self,
        outcome: Result<ProfessionalContact, FlowError>,
    ) -> Result<(), FlowError> {
        self.otp_email("finish verification")?;
        self.finish_pending("finish verification")?;
        let contact = outcome?;
        self.step = ContactStep::Done { contact };
        Ok(())
    }

    /// Go back from the OTP step to the email step.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step.
    pub fn change_email(&mut self) -> Result<Email, FlowError> {
        let previous = self.otp_email("change email")?;
        self.step = ContactStep::Email;
        self.in_flight.clear();
        Ok(previous)
    }

    /// Copy for a failed code request.
    ///
    /// A quota error always gets the quota copy, never the generic failure.
    #[must_use]
    pub fn request_error_message(error: &FlowError) -> String {
        match error {
            FlowError::RateLimited { .. } => QUOTA_EXCEEDED_MESSAGE.to_string(),
            FlowError::Validation(message) => message.clone(),
            FlowError::InFlight => "A request is already in progress.".to_string(),
            _ => SEND_FAILED_MESSAGE.to_string(),
        }
    }

    /// Copy for a failed verification.
    #[must_use]
    pub fn verify_error_message(error: &FlowError) -> String {
        match error {
            FlowError::RateLimited { .. } => QUOTA_EXCEEDED_MESSAGE.to_string(),
            FlowError::Validation(message) => message.clone(),
            FlowError::InFlight => "A request is already in progress.".to_string(),
            FlowError::Transport | FlowError::Server { .. } => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            _ => INVALID_CODE_MESSAGE.to_string(),
        }
    }

    fn expect_email_step(&self, operation: &'static str) -> Result<(), FlowError> {
        if matches!(self.step, ContactStep::Email) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                operation,
                step: self.step.name(),
            })
        }
    }

    fn otp_email(&self, operation: &'static str) -> Result<Email, FlowError> {
        self.email().cloned().ok_or(FlowError::InvalidTransition {
            operation,
            step: self.step.name(),
        })
    }

    const fn ensure_idle(&self) -> Result<(), FlowError> {
        self.in_flight.ensure_idle()
    }

    fn finish_pending(&mut self, operation: &'static str) -> Result<(), FlowError> {
        if self.in_flight.clear() {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                operation,
                step: self.step.name(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn flow_at_otp() -> ContactFlow {
        let mut flow = ContactFlow::new(ProfessionalId::new(9));
        let email = flow.begin_request_otp("visitor@example.com").unwrap();
        flow.complete_request_otp(email, Ok(())).unwrap();
        flow
    }

    #[test]
    fn test_full_reveal() {
        let mut flow = flow_at_otp();
        flow.begin_verify("654321").unwrap();
        flow.complete_verify(Ok(ProfessionalContact {
            phone: Some("+1 (555) 123-4567".to_string()),
            ..Default::default()
        }))
        .unwrap();

        let contact = flow.contact().unwrap();
        assert_eq!(contact.phone.as_deref(), Some("+1 (555) 123-4567"));
        assert_eq!(flow.professional_id(), ProfessionalId::new(9));
    }

    #[test]
    fn test_no_contact_before_done() {
        let flow = flow_at_otp();
        assert!(flow.contact().is_none());
        assert!(ContactFlow::new(ProfessionalId::new(1)).contact().is_none());
    }

    #[test]
    fn test_quota_on_request_and_verify_uses_quota_copy() {
        let quota = FlowError::from_status(429, Some("Too many requests".to_string()));
        assert_eq!(
            ContactFlow::request_error_message(&quota),
            QUOTA_EXCEEDED_MESSAGE
        );
        assert_eq!(
            ContactFlow::verify_error_message(&quota),
            QUOTA_EXCEEDED_MESSAGE
        );
    }

    #[test]
    fn test_quota_on_request_does_not_advance() {
        let mut flow = ContactFlow::new(ProfessionalId::new(3));
        let email = flow.begin_request_otp("visitor@example.com").unwrap();
        let err = flow
            .complete_request_otp(email, Err(FlowError::from_status(429, None)))
            .unwrap_err();

        assert!(err.is_recoverable_later());
        assert_eq!(flow.step(), &ContactStep::Email);
    }

    #[test]
    fn test_other_failures_use_generic_copy() {
        let err = FlowError::from_status(500, None);
        assert_eq!(
            ContactFlow::request_error_message(&err),
            SEND_FAILED_MESSAGE
        );

        let err = FlowError::from_status(400, Some("otp mismatch".to_string()));
        assert_eq!(ContactFlow::verify_error_message(&err), INVALID_CODE_MESSAGE);
    }

    #[test]
    fn test_backend_outage_on_verify_is_not_a_wrong_code() {
        let err = FlowError::from_status(503, Some("Database unavailable".to_string()));
        assert_eq!(
            ContactFlow::verify_error_message(&err),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_stale_verify_is_released() {
        let mut flow = flow_at_otp();
        flow.begin_verify("123456").unwrap();
        let lease = TimeDelta::seconds(30);

        assert!(!flow.release_stale(Utc::now(), lease));
        assert!(flow.is_in_flight());

        assert!(flow.release_stale(Utc::now() + lease, lease));
        assert!(flow.begin_verify("123456").is_ok());
    }

    #[test]
    fn test_failed_verify_stays_on_otp() {
        let mut flow = flow_at_otp();
        flow.begin_verify("111111").unwrap();
        assert!(
            flow.complete_verify(Err(FlowError::from_status(400, None)))
                .is_err()
        );
        assert!(matches!(flow.step(), ContactStep::Otp { .. }));
        assert!(!flow.is_in_flight());
    }

    #[test]
    fn test_resend_never_goes_back_to_email() {
        let mut flow = flow_at_otp();
        for _ in 0..3 {
            flow.begin_resend().unwrap();
            let _ = flow.complete_resend(Err(FlowError::Transport));
        }
        assert_eq!(flow.email().unwrap().as_str(), "visitor@example.com");
    }

    #[test]
    fn test_change_email_and_illegal_transitions() {
        let mut flow = flow_at_otp();
        flow.change_email().unwrap();
        assert_eq!(flow.step(), &ContactStep::Email);

        assert!(matches!(
            flow.begin_verify("123456"),
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            flow.complete_verify(Ok(ProfessionalContact::default())),
            Err(FlowError::InvalidTransition { .. })
        ));
        assert!(flow.contact().is_none());
    }

    #[test]
    fn test_malformed_code_is_rejected_locally() {
        let mut flow = flow_at_otp();
        assert!(matches!(
            flow.begin_verify("12a4"),
            Err(FlowError::Validation(_))
        ));
        assert!(!flow.is_in_flight());
    }

    #[test]
    fn test_double_verify_is_blocked() {
        let mut flow = flow_at_otp();
        flow.begin_verify("123456").unwrap();
        assert_eq!(flow.begin_verify("123456"), Err(FlowError::InFlight));
    }
}
