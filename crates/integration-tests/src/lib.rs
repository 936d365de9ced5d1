//! End-to-end test harness for the ProConnect edge.
//!
//! Every [`TestContext`] starts a `wiremock` server standing in for the
//! ProConnect backend and serves the full edge application (all middleware
//! included) on an ephemeral local port. Tests drive it with a real
//! `reqwest` client that keeps cookies and does not follow redirects, so
//! `Location` and `Set-Cookie` headers can be asserted directly.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p proconnect-integration-tests
//! ```

use std::net::SocketAddr;

use proconnect_web::config::WebConfig;
use proconnect_web::state::AppState;
use reqwest::{Client, Response, header};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running edge wired to a simulated backend.
pub struct TestContext {
    /// Simulated ProConnect backend.
    pub backend: MockServer,
    /// Cookie-keeping client that never follows redirects.
    pub client: Client,
    /// Base URL of the running edge, e.g. `http://127.0.0.1:54321`.
    pub base_url: String,
}

impl TestContext {
    /// Start a backend mock and an edge pointed at it.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`new`](Self::new), with `adjust` applied to the edge config.
    pub async fn with_config(adjust: impl FnOnce(&mut WebConfig)) -> Self {
        let backend = MockServer::start().await;
        let mut config = WebConfig::for_backend(&backend.uri());
        adjust(&mut config);
        let base_url = spawn_edge(config).await;

        Self {
            backend,
            client: client(),
            base_url,
        }
    }

    /// Absolute URL on the edge.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A second browser: same edge, empty cookie jar.
    #[must_use]
    pub fn fresh_client(&self) -> Client {
        client()
    }

    /// Mount a JSON answer on the backend for `verb path`.
    pub async fn mock_json(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.backend)
            .await;
    }

    /// Make the backend issue `token` on a successful login verification.
    pub async fn mock_login_verification(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/auth/verify-otp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(header::SET_COOKIE.as_str(), backend_set_cookie(token))
                    .set_body_json(professional_json()),
            )
            .mount(&self.backend)
            .await;
    }

    /// POST a form on the edge.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Failed to post form")
    }

    /// GET a page on the edge.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to get page")
    }

    /// Run the server-rendered login up to the code step.
    pub async fn start_login(&self, email: &str) {
        self.mock_json(
            "POST",
            "/api/auth/request-otp",
            200,
            json!({ "message": format!("Code sent to {email}") }),
        )
        .await;

        let response = self.post_form("/login/request-otp", &[("email", email)]).await;
        assert_eq!(response.status(), 200, "request-otp should render the code step");
    }
}

/// Serve the edge for `config` on an ephemeral port and return its base URL.
pub async fn spawn_edge(config: WebConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let app = proconnect_web::app(AppState::new(config));
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server error");
    });

    format!("http://{addr}")
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// `Set-Cookie` value as the backend issues it for its own domain.
#[must_use]
pub fn backend_set_cookie(token: &str) -> String {
    format!("proconnect_token={token}; Path=/; HttpOnly; SameSite=Lax; Domain=api.proconnect.app")
}

/// Identity body returned by the backend's `/me` and `verify-otp`.
#[must_use]
pub fn professional_json() -> Value {
    json!({
        "id": 42,
        "displayName": "Ada Carpenter",
        "email": "ada@example.com",
        "slug": "ada-carpenter",
        "isAvailable": true,
        "isVerified": true,
        "headline": "Fine joinery"
    })
}

/// All `Set-Cookie` headers on a response.
#[must_use]
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(String::from)
        .collect()
}

/// The `Set-Cookie` header for the session token, if any.
#[must_use]
pub fn session_set_cookie(response: &Response) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|cookie| cookie.starts_with("proconnect_token="))
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}
