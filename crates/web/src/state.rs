//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::WebConfig;
use crate::identity::IdentityCache;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, identity cache, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    identities: IdentityCache,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: WebConfig) -> Self {
        let backend = BackendClient::new(&config.api_url);
        let identities = IdentityCache::new(config.identity_cache_ttl_secs);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identities,
            }),
        }
    }

    /// Get a reference to the edge configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the identity shadow cache.
    #[must_use]
    pub fn identities(&self) -> &IdentityCache {
        &self.inner.identities
    }

    /// Whether outgoing cookies carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.inner.config.secure_cookies
    }
}
