//! Professional login flow: email -> OTP -> authenticated.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::{FlowError, GENERIC_FAILURE_MESSAGE};
use super::pending::Pending;
use crate::types::{Email, OtpCode};

/// Where the login flow currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum LoginStep {
    /// Collecting the email address.
    #[default]
    Email,
    /// A code was sent to `email`; waiting for the visitor to enter it.
    Otp {
        email: Email,
        /// Latest success message from the backend.
        message: String,
    },
    /// The code was accepted and a session was issued.
    Authenticated { email: Email },
}

impl LoginStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Otp { .. } => "otp",
            Self::Authenticated { .. } => "authenticated",
        }
    }
}

/// Login step machine with a per-flow in-flight guard.
///
/// The `Otp` step can only be entered through a successful
/// [`complete_request_otp`](Self::complete_request_otp), so there is no way
/// to deep-link into code entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlow {
    step: LoginStep,
    #[serde(default)]
    in_flight: Pending,
}

impl LoginFlow {
    /// Start a fresh flow at the email step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> &LoginStep {
        &self.step
    }

    /// Whether a backend call for this flow is pending.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_set()
    }

    /// Drop an in-flight mark older than `lease`.
    ///
    /// A mark is persisted before the backend call, so a request abandoned
    /// mid-call leaves it behind. Returns whether a stale mark was dropped.
    pub fn release_stale(&mut self, now: DateTime<Utc>, lease: TimeDelta) -> bool {
        self.in_flight.release_if_stale(now, lease)
    }

    /// Whether the flow finished with a session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.step, LoginStep::Authenticated { .. })
    }

    /// Email the current challenge was issued for, if any.
    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        match &self.step {
            LoginStep::Email => None,
            LoginStep::Otp { email, .. } | LoginStep::Authenticated { email } => Some(email),
        }
    }

    /// Validate the address and mark an OTP request as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the email step, `InFlight` if a request
    /// is pending, `Validation` for a malformed address.
    pub fn begin_request_otp(&mut self, raw_email: &str) -> Result<Email, FlowError> {
        self.expect_step("request a code", |s| matches!(s, LoginStep::Email))?;
        self.ensure_idle()?;
        let email = Email::parse(raw_email)?;
        self.in_flight.start();
        Ok(email)
    }

    /// Apply the backend answer to an OTP request.
    ///
    /// On success the flow moves to the OTP step; on failure it stays on the
    /// email step and the error is handed back for display.
    ///
    /// # Errors
    ///
    /// The backend error, or `InvalidTransition` if no request was pending.
    pub fn complete_request_otp(
        &mut self,
        email: Email,
        outcome: Result<String, FlowError>,
    ) -> Result<(), FlowError> {
        self.expect_step("finish a code request", |s| matches!(s, LoginStep::Email))?;
        self.finish_pending("finish a code request")?;
        let message = outcome?;
        self.step = LoginStep::Otp { email, message };
        Ok(())
    }

    /// Mark a resend for the current email as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step, `InFlight` if a request is
    /// pending.
    pub fn begin_resend(&mut self) -> Result<Email, FlowError> {
        self.expect_step("resend a code", |s| matches!(s, LoginStep::Otp { .. }))?;
        self.ensure_idle()?;
        let email = self.email().cloned().ok_or(FlowError::InvalidTransition {
            operation: "resend a code",
            step: self.step.name(),
        })?;
        self.in_flight.start();
        Ok(email)
    }

    /// Apply the backend answer to a resend. The flow never leaves the OTP
    /// step; only the displayed message is replaced.
    ///
    /// # Errors
    ///
    /// The backend error, or `InvalidTransition` if no resend was pending.
    pub fn complete_resend(&mut self, outcome: Result<String, FlowError>) -> Result<(), FlowError> {
        self.finish_pending("finish a resend")?;
        let latest = outcome?;
        if let LoginStep::Otp { message, .. } = &mut self.step {
            *message = latest;
        }
        Ok(())
    }

    /// Validate the code and mark verification as pending.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step, `InFlight` if a request is
    /// pending, `Validation` unless exactly six digits remain after
    /// sanitizing.
    pub fn begin_verify(&mut self, raw_code: &str) -> Result<(Email, OtpCode), FlowError> {
        self.expect_step("verify a code", |s| matches!(s, LoginStep::Otp { .. }))?;
        self.ensure_idle()?;
        let code = OtpCode::parse(raw_code)?;
        let email = self.email().cloned().ok_or(FlowError::InvalidTransition {
            operation: "verify a code",
            step: self.step.name(),
        })?;
        self.in_flight.start();
        Ok((email, code))
    }

    /// Apply the backend answer to a verification.
    ///
    /// # Errors
    ///
    /// The backend error (the flow stays on the OTP step for another try),
    /// or `InvalidTransition` if no verification was pending.
    pub fn complete_verify(&mut self, outcome: Result<(), FlowError>) -> Result<(), FlowError> {
        self.expect_step("finish verification", |s| matches!(s, LoginStep::Otp { .. }))?;
        self.finish_pending("finish verification")?;
        outcome?;
        if let LoginStep::Otp { email, .. } = &self.step {
            self.step = LoginStep::Authenticated {
                email: email.clone(),
            };
        }
        Ok(())
    }

    /// Go back from the OTP step to the email step.
    ///
    /// Returns the address that was in use so the form can be prefilled.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside the OTP step.
    pub fn change_email(&mut self) -> Result<Email, FlowError> {
        let LoginStep::Otp { email, .. } = &self.step else {
            return Err(FlowError::InvalidTransition {
                operation: "change email",
                step: self.step.name(),
            });
        };
        let previous = email.clone();
        self.step = LoginStep::Email;
        self.in_flight.clear();
        Ok(previous)
    }

    /// Copy for a failed OTP request. Backend messages are shown verbatim.
    #[must_use]
    pub fn request_error_message(error: &FlowError) -> String {
        Self::message_for(error, "Failed to send OTP")
    }

    /// Copy for a failed verification. Backend messages are shown verbatim.
    #[must_use]
    pub fn verify_error_message(error: &FlowError) -> String {
        Self::message_for(error, "Invalid or expired OTP")
    }

    fn message_for(error: &FlowError, fallback: &str) -> String {
        match error {
            FlowError::Validation(message) => message.clone(),
            FlowError::RateLimited { .. }
            | FlowError::Verification { .. }
            | FlowError::Server { .. } => error
                .backend_message()
                .map_or_else(|| fallback.to_string(), str::to_string),
            FlowError::Transport | FlowError::Unauthenticated => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            FlowError::InFlight => "A request is already in progress.".to_string(),
            FlowError::InvalidTransition { .. } => {
                "Your sign-in attempt expired. Please enter your email again.".to_string()
            }
        }
    }

    fn expect_step(
        &self,
        operation: &'static str,
        allowed: impl Fn(&LoginStep) -> bool,
    ) -> Result<(), FlowError> {
        if allowed(&self.step) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                operation,
                step: self.step.name(),
            })
        }
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
