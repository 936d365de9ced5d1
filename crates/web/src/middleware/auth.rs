//! Session cookie extractors.
//!
//! These only check that a `proconnect_token` cookie is present. Whether the
//! token is valid is for the backend to decide on the forwarded call.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use proconnect_core::{SESSION_COOKIE_NAME, guard};

use crate::models::SessionToken;

/// Extractor that requires a session cookie.
///
/// If the cookie is missing, page requests are redirected to the login page
/// and `/api/` requests get `401 {"error": "Unauthorized"}`.
///
/// # Example
///
/// ```rust,ignore
/// async fn stats(State(state): State<AppState>, RequireSession(token): RequireSession) -> Response {
///     relay(state.backend().my_stats(&token).await)
/// }
/// ```
pub struct RequireSession(pub SessionToken);

/// Error returned when a session is required but no cookie was sent.
pub enum SessionRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_token(parts).map(Self).ok_or_else(|| {
            // Nested routers see `parts.uri` with their prefix stripped.
            let path = parts
                .extensions
                .get::<OriginalUri>()
                .map_or_else(|| parts.uri.path(), |OriginalUri(uri)| uri.path());
            if path.starts_with("/api/") {
                SessionRejection::Unauthorized
            } else {
                SessionRejection::RedirectToLogin(guard::login_location(path))
            }
        })
    }
}

/// Extractor that optionally gets the session token.
///
/// Unlike `RequireSession`, this never rejects the request.
pub struct OptionalSession(pub Option<SessionToken>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_token(parts)))
    }
}

/// Read the session token from the request cookies. Empty values count as
/// absent.
fn session_token(parts: &Parts) -> Option<SessionToken> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| SessionToken::new(cookie.value()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, header};

    use super::*;

    fn parts(uri: &str, cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_require_session_reads_cookie() {
        let mut parts = parts("/api/professionals/me", Some("a=b; proconnect_token=tok"));
        let RequireSession(token) = RequireSession::from_request_parts(&mut parts, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(token.expose(), "tok");
    }

    #[tokio::test]
    async fn test_api_rejection_is_401_json() {
        let mut parts = parts("/api/professionals/me", None);
        let rejection = RequireSession::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_nested_api_rejection_uses_original_path() {
        // As seen inside `.nest("/api", ...)`.
        let mut parts = parts("/professionals/me", None);
        parts
            .extensions
            .insert(OriginalUri("/api/professionals/me".parse().unwrap()));

        let rejection = RequireSession::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_page_rejection_redirects_to_login() {
        let mut parts = parts("/dashboard/availability", Some("proconnect_token="));
        let rejection = RequireSession::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?redirect=%2Fdashboard%2Favailability"
        );
    }

    #[tokio::test]
    async fn test_optional_session_never_rejects() {
        let mut parts = parts("/", None);
        let OptionalSession(token) = OptionalSession::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(token.is_none());
    }
}
