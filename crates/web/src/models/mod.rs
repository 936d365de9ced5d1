//! Edge-side models.
//!
//! Domain types live in `proconnect-core`; this module holds what only the
//! web edge needs: the session token wrapper and flow session keys.

pub mod session;

pub use session::{SessionToken, session_keys};
