//! ProConnect Core - Shared types and flow state machines.
//!
//! This crate provides the pieces of the ProConnect edge that carry real
//! state-machine structure:
//! - `web` - The same-origin edge server (proxy routes, route guard, pages)
//! - `integration-tests` - End-to-end tests against a simulated backend
//!
//! # Architecture
//!
//! The core crate contains only types, pure functions, and state machines -
//! no I/O, no HTTP clients. Network calls are made by the `web` crate, which
//! drives the flows here through explicit begin/complete transitions.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, OTP codes, IDs, and professionals
//! - [`flow`] - Login and contact-reveal step machines plus their error taxonomy
//! - [`guard`] - Presence-only route guard decisions
//! - [`cookie`] - Session cookie constants and `Set-Cookie` extraction
//! - [`cache`] - TTL cache with an injectable clock

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod cookie;
pub mod flow;
pub mod guard;
pub mod types;

pub use cache::{Clock, SystemClock, TtlCache};
pub use cookie::{SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS, extract_cookie_value};
pub use flow::{ContactFlow, ContactStep, FlowError, LoginFlow, LoginStep};
pub use guard::{GuardDecision, evaluate, post_login_target};
pub use types::*;
