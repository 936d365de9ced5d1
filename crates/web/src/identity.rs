//! Identity shadow cache.
//!
//! Holds the last [`AuthProfessional`] the backend returned for a session
//! token, keyed by the token's fingerprint. Entries are stale by
//! construction: they are only rendered when the authoritative `/me` call
//! fails in transport, and always flagged as such.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Duration;

use proconnect_core::{AuthProfessional, Clock, SystemClock, TtlCache};

use crate::models::SessionToken;

/// Upper bound on the configured TTL (one year).
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Shared, lock-guarded identity cache.
#[derive(Clone)]
pub struct IdentityCache<C: Clock = SystemClock> {
    inner: Arc<RwLock<TtlCache<String, AuthProfessional, C>>>,
}

impl IdentityCache<SystemClock> {
    /// Create a cache backed by the wall clock.
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, SystemClock)
    }
}

impl<C: Clock> IdentityCache<C> {
    /// Create a cache backed by `clock`.
    #[must_use]
    pub fn with_clock(ttl_secs: u64, clock: C) -> Self {
        let ttl_secs = i64::try_from(ttl_secs.min(MAX_TTL_SECS)).unwrap_or_default();
        let ttl = Duration::seconds(ttl_secs);
        Self {
            inner: Arc::new(RwLock::new(TtlCache::with_clock(ttl, clock))),
        }
    }

    /// Last known identity for `token`, if still within the TTL.
    #[must_use]
    pub fn get(&self, token: &SessionToken) -> Option<AuthProfessional> {
        let cache = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        cache.get(&token.fingerprint()).cloned()
    }

    /// Remember the identity the backend just returned for `token`.
    pub fn remember(&self, token: &SessionToken, professional: AuthProfessional) {
        let mut cache = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        cache.purge_expired();
        cache.insert(token.fingerprint(), professional);
    }

    /// Drop the entry for `token`.
    pub fn forget(&self, token: &SessionToken) {
        let mut cache = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        cache.invalidate(&token.fingerprint());
    }
}
