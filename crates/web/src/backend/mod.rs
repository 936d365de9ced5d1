//! ProConnect backend API client.
//!
//! Every call returns the backend's status, JSON body, and `Set-Cookie`
//! headers untouched in a [`BackendReply`]. Interpreting the reply (relaying
//! it, classifying it into a flow error, extracting a session token) is the
//! caller's job. Only transport-level failures become a [`BackendError`].
//!
//! No client-side timeout is configured; reqwest's defaults apply.

mod error;

pub use error::BackendError;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use proconnect_core::{FlowError, ProfessionalId};

use crate::models::SessionToken;

/// Header carrying the visitor's IP to the contact endpoints.
const FORWARDED_FOR: &str = "x-forwarded-for";

// =============================================================================
// BackendReply
// =============================================================================

/// A backend answer, whatever its status.
#[derive(Debug, Clone)]
pub struct BackendReply {
    /// Backend HTTP status.
    pub status: StatusCode,
    /// Decoded JSON body. An empty body decodes to `{}`.
    pub body: Value,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
}

impl BackendReply {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The backend's `error` or `message` field, whichever is present.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        ["error", "message"]
            .iter()
            .find_map(|field| self.body.get(*field).and_then(Value::as_str))
            .map(String::from)
    }

}

/// Classify a backend call for a flow: successful replies pass through,
/// error statuses become a `FlowError` by status (message kept), and
/// transport failures become `FlowError::Transport`.
///
/// # Errors
///
/// Returns the classified `FlowError` for anything but a 2xx reply.
pub fn flow_outcome(result: Result<BackendReply, BackendError>) -> Result<BackendReply, FlowError> {
    match result {
        Ok(reply) if reply.is_success() => Ok(reply),
        Ok(reply) => Err(FlowError::from_status(
            reply.status.as_u16(),
            reply.message(),
        )),
        Err(e) => {
            tracing::warn!(error = %e, "Backend call failed");
            Err(FlowError::Transport)
        }
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the ProConnect backend API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    /// `POST /api/auth/request-otp`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend is unreachable or answers with
    /// a non-JSON body.
    #[instrument(skip(self, body))]
    pub async fn request_otp<B>(&self, body: &B) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, "/api/auth/request-otp").json(body))
            .await
    }

    /// `POST /api/auth/verify-otp`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip(self, body))]
    pub async fn verify_otp<B>(&self, body: &B) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, "/api/auth/verify-otp").json(body))
            .await
    }

    /// `GET /api/auth/me` with the bearer token.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &SessionToken) -> Result<BackendReply, BackendError> {
        self.send(self.authorized(Method::GET, "/api/auth/me", token))
            .await
    }

    /// `POST /api/auth/logout`, forwarding the session cookie if present.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: Option<&SessionToken>) -> Result<BackendReply, BackendError> {
        let mut request = self.request(Method::POST, "/api/auth/logout");
        if let Some(token) = token {
            request = request.header(COOKIE, token.cookie_header());
        }
        self.send(request).await
    }

    // -------------------------------------------------------------------------
    // Contact reveal
    // -------------------------------------------------------------------------

    /// `POST /api/contact/professionals/{id}/request-otp`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip(self, body), fields(professional_id = %id))]
    pub async fn request_contact_otp<B>(
        &self,
        id: ProfessionalId,
        body: &B,
        client_ip: &str,
    ) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("/api/contact/professionals/{id}/request-otp");
        self.send(
            self.request(Method::POST, &path)
                .header(FORWARDED_FOR, client_ip)
                .json(body),
        )
        .await
    }

    /// `POST /api/contact/professionals/{id}/verify-otp`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip(self, body), fields(professional_id = %id))]
    pub async fn verify_contact_otp<B>(
        &self,
        id: ProfessionalId,
        body: &B,
        client_ip: &str,
    ) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("/api/contact/professionals/{id}/verify-otp");
        self.send(
            self.request(Method::POST, &path)
                .header(FORWARDED_FOR, client_ip)
                .json(body),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Professionals
    // -------------------------------------------------------------------------

    /// `GET /api/professionals/{id}`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip(self))]
    pub async fn professional(&self, id: &str) -> Result<BackendReply, BackendError> {
        let path = format!("/api/professionals/{}", urlencoding::encode(id));
        self.send(self.request(Method::GET, &path)).await
    }

    /// `GET /api/professionals/me`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn my_profile(&self, token: &SessionToken) -> Result<BackendReply, BackendError> {
        self.send(self.authorized(Method::GET, "/api/professionals/me", token))
            .await
    }

    /// `PUT /api/professionals/me`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn update_my_profile<B>(
        &self,
        token: &SessionToken,
        body: &B,
    ) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.send(
            self.authorized(Method::PUT, "/api/professionals/me", token)
                .json(body),
        )
        .await
    }

    /// `GET /api/professionals/me/stats`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn my_stats(&self, token: &SessionToken) -> Result<BackendReply, BackendError> {
        self.send(self.authorized(Method::GET, "/api/professionals/me/stats", token))
            .await
    }

    /// `PATCH /api/professionals/me/availability`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn set_availability<B>(
        &self,
        token: &SessionToken,
        body: &B,
    ) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        self.send(
            self.authorized(Method::PATCH, "/api/professionals/me/availability", token)
                .json(body),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Reviews
    // -------------------------------------------------------------------------

    /// `GET /api/reviews/token/{token}`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn review_invitation(&self, review_token: &str) -> Result<BackendReply, BackendError> {
        let path = format!("/api/reviews/token/{}", urlencoding::encode(review_token));
        self.send(self.request(Method::GET, &path)).await
    }

    /// `POST /api/reviews/token/{token}`
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure.
    #[instrument(skip_all)]
    pub async fn submit_review<B>(
        &self,
        review_token: &str,
        body: &B,
    ) -> Result<BackendReply, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("/api/reviews/token/{}", urlencoding::encode(review_token));
        self.send(self.request(Method::POST, &path).json(body))
            .await
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    /// Whether the backend answers HTTP at all. Any status counts.
    pub async fn is_reachable(&self) -> bool {
        self.inner
            .client
            .get(format!("{}/health", self.inner.base_url))
            .send()
            .await
            .is_ok()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.base_url))
            .header(CONTENT_TYPE, "application/json")
    }

    fn authorized(&self, method: Method, path: &str, token: &SessionToken) -> RequestBuilder {
        self.request(method, path)
            .header(AUTHORIZATION, token.bearer())
    }

    async fn send(&self, request: RequestBuilder) -> Result<BackendReply, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(String::from)
            .collect();

        let bytes = response.bytes().await?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|_| BackendError::NonJson { status })?
        };

        debug!(status = status.as_u16(), "Backend replied");

        Ok(BackendReply {
            status,
            body,
            set_cookies,
        })
    }
}
