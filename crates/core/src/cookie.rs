//! Session cookie constants and backend `Set-Cookie` extraction.
//!
//! The backend issues the session on its own domain. The edge reads the raw
//! `Set-Cookie` header from the server-to-server response and re-issues the
//! token on its own domain, which is what lets an `HttpOnly` cookie survive
//! the cross-domain deployment.

use regex::Regex;

/// Name of the session cookie on both the backend and the edge.
pub const SESSION_COOKIE_NAME: &str = "proconnect_token";

/// Session cookie lifetime: 30 days.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Extract the value of cookie `name` from one or more `Set-Cookie` header
/// values.
///
/// Headers may arrive separately or joined with `", "` by an intermediary.
/// A missing, empty, or malformed header yields `None`, which callers treat
/// as "no token issued".
///
/// ```
/// use proconnect_core::extract_cookie_value;
///
/// let headers = ["proconnect_token=abc.def; Path=/; HttpOnly"];
/// assert_eq!(
///     extract_cookie_value(headers, "proconnect_token").as_deref(),
///     Some("abc.def")
/// );
/// assert_eq!(extract_cookie_value(["garbage"], "proconnect_token"), None);
/// ```
#[must_use]
pub fn extract_cookie_value<'a, I>(set_cookie_headers: I, name: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let pattern = format!(r"(?:^|[\s;,]){}=([^;,\s]+)", regex::escape(name));
    let regex = Regex::new(&pattern).ok()?;

    set_cookie_headers.into_iter().find_map(|header| {
        regex
            .captures(header)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string())
    })
}
