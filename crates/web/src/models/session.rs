//! Session-related types.
//!
//! The auth token lives in the `proconnect_token` cookie; the flow session
//! (`tower-sessions`) only ever stores in-progress step machines.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use proconnect_core::{ProfessionalId, SESSION_COOKIE_NAME};

/// Backend-signed session token, opaque to the edge.
///
/// `Debug` output is redacted by `SecretString`.
#[derive(Debug, Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    /// Wrap a raw token. Blank values are treated as absent.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(SecretString::from(raw)))
        }
    }

    /// Raw token value, for the outgoing cookie.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }

    /// `Cookie` header value, for endpoints that read the cookie directly.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE_NAME}={}", self.expose())
    }

    /// Stable, non-reversible key for caches and logs.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.expose().as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

/// Session keys for flow state.
pub mod session_keys {
    use super::ProfessionalId;

    /// Key for the in-progress login flow.
    pub const LOGIN_FLOW: &str = "login_flow";

    /// Key for the post-login redirect target.
    pub const LOGIN_REDIRECT: &str = "login_redirect";

    /// Key for the contact flow of one professional.
    #[must_use]
    pub fn contact_flow(professional_id: ProfessionalId) -> String {
        format!("contact_flow:{professional_id}")
    }
}
