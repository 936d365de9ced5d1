//! In-flight marker shared by both flows.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::FlowError;

/// When the flow's pending backend call started, if one is pending.
///
/// The marker is persisted with the flow, so it outlives a request whose
/// handler never finished (client disconnect, cancelled future). Such a
/// marker is released once it is older than the caller's lease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Pending(Option<DateTime<Utc>>);

impl Pending {
    pub(crate) const fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) const fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.is_set() {
            Err(FlowError::InFlight)
        } else {
            Ok(())
        }
    }

    pub(crate) fn start(&mut self) {
        self.0 = Some(Utc::now());
    }

    /// Clear the marker. Returns whether one was set.
    pub(crate) fn clear(&mut self) -> bool {
        self.0.take().is_some()
    }

    /// Clear the marker if it was set more than `lease` before `now`.
    pub(crate) fn release_if_stale(&mut self, now: DateTime<Utc>, lease: TimeDelta) -> bool {
        match self.0 {
            Some(started) if now - started >= lease => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_marker_is_kept() {
        let mut pending = Pending::default();
        pending.start();
        assert!(!pending.release_if_stale(Utc::now(), TimeDelta::seconds(30)));
        assert_eq!(pending.ensure_idle(), Err(FlowError::InFlight));
    }

    #[test]
    fn test_old_marker_is_released() {
        let mut pending = Pending::default();
        pending.start();
        let later = Utc::now() + TimeDelta::seconds(31);
        assert!(pending.release_if_stale(later, TimeDelta::seconds(30)));
        assert_eq!(pending.ensure_idle(), Ok(()));
        assert!(!pending.release_if_stale(later, TimeDelta::seconds(30)));
    }
}
