//! HTTP middleware stack for the edge.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame denial, no-store)
//! 5. Session layer (tower-sessions, in-memory flow store)
//! 6. Route guard (session cookie presence on `/dashboard` and `/login`)
//! 7. Rate limiting (governor, OTP-issuing routes only)

pub mod auth;
pub mod client_ip;
pub mod guard;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalSession, RequireSession};
pub use client_ip::ClientIp;
pub use guard::route_guard_middleware;
pub use rate_limit::otp_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
