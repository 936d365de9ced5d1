//! Session cookie construction.
//!
//! The token cookie is only ever set by OTP verification and cleared by
//! logout (or a backend 401 on the dashboard).

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use proconnect_core::{SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS};

use crate::models::SessionToken;

/// Create the session cookie carrying `token`.
#[must_use]
pub fn session_cookie(token: &SessionToken, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.expose().to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(SESSION_MAX_AGE_SECS))
        .build()
}

/// Create the removal cookie for the session.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let token = SessionToken::new("abc").unwrap();
        let cookie = session_cookie(&token, true);

        assert_eq!(cookie.name(), "proconnect_token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(2_592_000)));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.secure(), Some(false));

        let header = cookie.to_string();
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("Path=/"));
    }
}
