//! Flow session configuration.
//!
//! In-progress login and contact-reveal flows are kept server-side in a
//! bounded in-memory `tower-sessions` store backed by moka. Entries are
//! evicted once their expiry passes or the store is full, so abandoned
//! sessions do not accumulate. The flow session cookie never carries the
//! auth token; that lives in `proconnect_token`.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::WebConfig;

/// Flow session cookie name.
pub const FLOW_COOKIE_NAME: &str = "proconnect_flow";

/// Flow sessions expire after 30 minutes of inactivity.
const FLOW_EXPIRY_SECONDS: i64 = 30 * 60;

/// Upper bound on flow sessions held at once. The least recently used are
/// evicted first.
const MAX_FLOW_SESSIONS: u64 = 100_000;

/// Create the flow session layer with a bounded in-memory store.
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> SessionManagerLayer<MokaStore> {
    let store = MokaStore::new(Some(MAX_FLOW_SESSIONS));

    SessionManagerLayer::new(store)
        .with_name(FLOW_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(FLOW_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
