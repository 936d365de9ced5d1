//! Core types for ProConnect.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! authentication and contact-reveal flows exchange with the backend.

pub mod email;
pub mod id;
pub mod otp;
pub mod professional;

pub use email::{Email, EmailError};
pub use id::*;
pub use otp::{OtpCode, OtpCodeError};
pub use professional::{AuthProfessional, ContactKind, ContactLink, ProfessionalContact};
