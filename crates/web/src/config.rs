//! Edge configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PROCONNECT_BASE_URL` - Public URL of the edge (e.g. `https://proconnect.app`)
//!
//! ## Optional
//! - `PROCONNECT_API_URL` - Backend API base URL (falls back to `API_URL`,
//!   then `http://localhost:8080`)
//! - `PROCONNECT_HOST` - Bind address (default: 127.0.0.1)
//! - `PROCONNECT_PORT` - Listen port (default: 3000)
//! - `PROCONNECT_SECURE_COOKIES` - Force the `Secure` cookie attribute on or
//!   off (default: on when the base URL is `https://`)
//! - `PROCONNECT_RATE_LIMIT` - Rate limit OTP-issuing endpoints (default: true)
//! - `PROCONNECT_IDENTITY_CACHE_TTL_SECS` - Identity shadow-cache TTL (default: 300)
//! - `PROCONNECT_FLOW_LEASE_SECS` - Age after which an unfinished login or
//!   contact request stops blocking its flow (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::TimeDelta;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Edge application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Backend API base URL, without a trailing slash
    pub api_url: String,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the edge
    pub base_url: String,
    /// Whether cookies carry the `Secure` attribute
    pub secure_cookies: bool,
    /// Whether OTP-issuing endpoints are rate limited
    pub rate_limit: bool,
    /// Identity shadow-cache TTL in seconds
    pub identity_cache_ttl_secs: u64,
    /// Seconds an in-flight flow request may block retries
    pub flow_lease_secs: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let api_url = env
            .optional("PROCONNECT_API_URL")
            .or_else(|| env.optional("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = validate_url("PROCONNECT_API_URL", &api_url)?;

        let host = env.parse_or("PROCONNECT_HOST", "127.0.0.1")?;
        let port = env.parse_or("PROCONNECT_PORT", "3000")?;

        let base_url = env.required("PROCONNECT_BASE_URL")?;
        let base_url = validate_url("PROCONNECT_BASE_URL", &base_url)?;

        let secure_cookies = match env.optional("PROCONNECT_SECURE_COOKIES") {
            Some(value) => parse_bool("PROCONNECT_SECURE_COOKIES", &value)?,
            None => base_url.starts_with("https://"),
        };
        let rate_limit = match env.optional("PROCONNECT_RATE_LIMIT") {
            Some(value) => parse_bool("PROCONNECT_RATE_LIMIT", &value)?,
            None => true,
        };
        let identity_cache_ttl_secs = env.parse_or("PROCONNECT_IDENTITY_CACHE_TTL_SECS", "300")?;
        let flow_lease_secs = env.parse_or("PROCONNECT_FLOW_LEASE_SECS", "30")?;

        Ok(Self {
            api_url,
            host,
            port,
            base_url,
            secure_cookies,
            rate_limit,
            identity_cache_ttl_secs,
            flow_lease_secs,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// How long an in-flight mark is honoured before a retry may proceed.
    #[must_use]
    pub fn flow_lease(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.flow_lease_secs))
    }

    /// Configuration pointing at `api_url`, for tests and local tooling.
    #[must_use]
    pub fn for_backend(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            secure_cookies: false,
            rate_limit: false,
            identity_cache_ttl_secs: 300,
            flow_lease_secs: 30,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Check that `value` is an absolute http(s) URL and strip any trailing slash.
fn validate_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
