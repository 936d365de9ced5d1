//! ProConnect web edge library.
//!
//! This crate provides the edge as a library, allowing it to be tested and
//! reused. The binary in `main.rs` only adds configuration loading, Sentry
//! and tracing initialization, and the listener.
//!
//! # Security
//!
//! The edge never validates session tokens itself. It checks the
//! `proconnect_token` cookie for presence, forwards it to the backend as a
//! bearer token, and re-issues the backend's `Set-Cookie` for its own domain.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod cookies;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    create_session_layer, request_id_middleware, route_guard_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Build the complete application: routes plus the middleware stack.
///
/// Layers, outermost first: Sentry, `TraceLayer`, request ID, security
/// headers, flow session, route guard. The rate limiter sits on the
/// OTP-issuing routes only.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let rate_limit = state.config().rate_limit;

    routes::routes(rate_limit)
        .layer(axum::middleware::from_fn(route_guard_middleware))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
