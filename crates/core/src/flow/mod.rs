//! Step machines for the two OTP-gated flows.
//!
//! Both flows follow the same shape: an operation is split into a `begin_*`
//! transition (validates input, checks the step, raises the in-flight flag)
//! and a `complete_*` transition (lowers the flag and applies the backend
//! outcome). The caller performs the network call in between, so the flow
//! values themselves stay free of I/O and can be stored in a session.
//!
//! The in-flight mark carries its start time. A caller that loads a flow
//! from storage should call `release_stale` first so a request that died
//! mid-call does not lock the flow forever.

mod contact;
mod error;
mod login;
mod pending;

pub use contact::{ContactFlow, ContactStep, QUOTA_EXCEEDED_MESSAGE};
pub use error::{FlowError, GENERIC_FAILURE_MESSAGE};
pub use login::{LoginFlow, LoginStep};
