//! Route guard decisions.
//!
//! The guard is a presence-only check: it never validates the session
//! token's signature or expiry. A forged or expired cookie passes here and
//! fails later when the backend rejects the authenticated call.

/// Path prefix that requires a session cookie.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Login page path.
pub const LOGIN_PATH: &str = "/login";

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Pass the request through unmodified.
    Allow,
    /// Send the visitor to the login page, remembering where they were going.
    RedirectToLogin {
        /// Full `Location` value, e.g. `/login?redirect=%2Fdashboard`.
        location: String,
    },
    /// Already signed in; skip the login page.
    RedirectToDashboard,
}

/// Whether `path` is the dashboard or anything beneath it.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    path.strip_prefix(DASHBOARD_PATH)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Decide how to treat a navigation to `path`.
///
/// ```
/// use proconnect_core::{GuardDecision, evaluate};
///
/// assert_eq!(
///     evaluate("/dashboard/settings", false),
///     GuardDecision::RedirectToLogin {
///         location: "/login?redirect=%2Fdashboard%2Fsettings".to_string()
///     }
/// );
/// assert_eq!(evaluate("/dashboard/settings", true), GuardDecision::Allow);
/// assert_eq!(evaluate("/login", true), GuardDecision::RedirectToDashboard);
/// ```
#[must_use]
pub fn evaluate(path: &str, has_session_cookie: bool) -> GuardDecision {
    if is_protected(path) && !has_session_cookie {
        return GuardDecision::RedirectToLogin {
            location: login_location(path),
        };
    }

    if path == LOGIN_PATH && has_session_cookie {
        return GuardDecision::RedirectToDashboard;
    }

    GuardDecision::Allow
}

/// Login URL that returns the visitor to `original_path` afterwards.
#[must_use]
pub fn login_location(original_path: &str) -> String {
    format!(
        "{LOGIN_PATH}?redirect={}",
        urlencoding::encode(original_path)
    )
}

/// Where to send a professional after a successful login.
///
/// Only dashboard paths are honoured; anything else (absent, external, or
/// scheme-relative) falls back to the dashboard root so the parameter
/// cannot be used as an open redirect.
#[must_use]
pub fn post_login_target(redirect: Option<&str>) -> &str {
    match redirect {
        Some(target) if is_protected(target) && !target.contains("//") => target,
        _ => DASHBOARD_PATH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_without_cookie_redirects_with_original_path() {
        assert_eq!(
            evaluate("/dashboard/settings", false),
            GuardDecision::RedirectToLogin {
                location: "/login?redirect=%2Fdashboard%2Fsettings".to_string()
            }
        );
        assert_eq!(
            evaluate("/dashboard", false),
            GuardDecision::RedirectToLogin {
                location: "/login?redirect=%2Fdashboard".to_string()
            }
        );
    }

    #[test]
    fn test_dashboard_with_cookie_passes() {
        assert_eq!(evaluate("/dashboard", true), GuardDecision::Allow);
        assert_eq!(evaluate("/dashboard/settings", true), GuardDecision::Allow);
    }

    #[test]
    fn test_login_with_cookie_goes_to_dashboard() {
        assert_eq!(evaluate("/login", true), GuardDecision::RedirectToDashboard);
        assert_eq!(evaluate("/login", false), GuardDecision::Allow);
    }

    #[test]
    fn test_other_paths_pass_through() {
        for path in ["/", "/professionals/4", "/login/verify", "/dashboards", "/api/auth/me"] {
            assert_eq!(evaluate(path, false), GuardDecision::Allow, "{path}");
            assert_eq!(evaluate(path, true), GuardDecision::Allow, "{path}");
        }
    }

    #[test]
    fn test_post_login_target_rejects_foreign_paths() {
        assert_eq!(post_login_target(None), "/dashboard");
        assert_eq!(
            post_login_target(Some("/dashboard/settings")),
            "/dashboard/settings"
        );
        assert_eq!(post_login_target(Some("https://evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("/dashboard//evil")), "/dashboard");
        assert_eq!(post_login_target(Some("/professionals")), "/dashboard");
    }
}
