//! Integration tests for the server-rendered login flow.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use proconnect_integration_tests::{
    TestContext, location, professional_json, session_set_cookie,
};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_request_then_verify_sets_session_cookie() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;
    ctx.mock_login_verification("signed-token").await;

    let response = ctx.post_form("/login/verify", &[("otp", "123456")]).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));

    let cookie = session_set_cookie(&response).expect("session cookie should be set");
    assert!(cookie.starts_with("proconnect_token=signed-token"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=2592000"));
    assert!(!cookie.contains("api.proconnect.app"));

    // The cookie now opens the dashboard
    ctx.mock_json("GET", "/api/auth/me", 200, professional_json())
        .await;
    let response = ctx.get("/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Ada Carpenter"));
}

#[tokio::test]
async fn test_code_step_shows_backend_message() {
    let ctx = TestContext::new().await;
    ctx.mock_json(
        "POST",
        "/api/auth/request-otp",
        200,
        json!({ "message": "Code sent to ada@example.com" }),
    )
    .await;

    let response = ctx
        .post_form("/login/request-otp", &[("email", "  Ada@Example.com ")])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Code sent to ada@example.com"));
    assert!(body.contains("action=\"/login/verify\""));
}

#[tokio::test]
async fn test_preserved_redirect_is_honoured() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/login?redirect=%2Fdashboard%2Fsettings").await;
    assert_eq!(response.status(), StatusCode::OK);

    ctx.start_login("ada@example.com").await;
    ctx.mock_login_verification("signed-token").await;
    let response = ctx.post_form("/login/verify", &[("otp", "123456")]).await;

    assert_eq!(location(&response).as_deref(), Some("/dashboard/settings"));
}

#[tokio::test]
async fn test_offsite_redirect_falls_back_to_dashboard() {
    let ctx = TestContext::new().await;

    ctx.get("/login?redirect=https%3A%2F%2Fevil.example").await;
    ctx.start_login("ada@example.com").await;
    ctx.mock_login_verification("signed-token").await;
    let response = ctx.post_form("/login/verify", &[("otp", "123456")]).await;

    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_malformed_code_never_reaches_backend() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.backend)
        .await;

    for code in ["12a45", "12345", ""] {
        let response = ctx.post_form("/login/verify", &[("otp", code)]).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response.text().await.unwrap();
        assert!(body.contains("Please enter the 6-digit code."));
        assert!(body.contains("action=\"/login/verify\""));
    }
}

#[tokio::test]
async fn test_sanitized_code_is_forwarded() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp"))
        .and(body_json(json!({ "email": "ada@example.com", "otp": "123456" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "proconnect_token=tok; Path=/")
                .set_body_json(professional_json()),
        )
        .expect(1)
        .mount(&ctx.backend)
        .await;

    let response = ctx.post_form("/login/verify", &[("otp", "123 456")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_invalid_email_is_rejected_locally() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/request-otp"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.backend)
        .await;

    let response = ctx
        .post_form("/login/request-otp", &[("email", "not-an-email")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Please enter a valid email address."));
    assert!(body.contains("value=\"not-an-email\""));
}

// ============================================================================
// Backend Errors
// ============================================================================

#[tokio::test]
async fn test_backend_request_error_is_shown_verbatim() {
    let ctx = TestContext::new().await;
    ctx.mock_json(
        "POST",
        "/api/auth/request-otp",
        404,
        json!({ "error": "No professional with that email" }),
    )
    .await;

    let response = ctx
        .post_form("/login/request-otp", &[("email", "ada@example.com")])
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("No professional with that email"));
    assert!(body.contains("value=\"ada@example.com\""));
    assert!(body.contains("action=\"/login/request-otp\""));
}

#[tokio::test]
async fn test_backend_outage_message_is_shown() {
    let ctx = TestContext::new().await;
    ctx.mock_json(
        "POST",
        "/api/auth/request-otp",
        503,
        json!({ "error": "Email delivery is paused for maintenance" }),
    )
    .await;

    let response = ctx
        .post_form("/login/request-otp", &[("email", "ada@example.com")])
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Email delivery is paused for maintenance"));
    assert!(!body.contains("Something went wrong"));
}

#[tokio::test]
async fn test_abandoned_request_stops_blocking_after_lease() {
    let ctx = TestContext::with_config(|config| config.flow_lease_secs = 2).await;

    // Establish the flow session before the request that never answers.
    let response = ctx.get("/login?redirect=%2Fdashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    Mock::given(method("POST"))
        .and(path("/api/auth/request-otp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(4))
                .set_body_json(json!({ "message": "Code sent" })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&ctx.backend)
        .await;
    ctx.mock_json(
        "POST",
        "/api/auth/request-otp",
        200,
        json!({ "message": "Code sent to ada@example.com" }),
    )
    .await;

    let abandoned = ctx
        .client
        .post(ctx.url("/login/request-otp"))
        .form(&[("email", "ada@example.com")])
        .timeout(Duration::from_millis(300))
        .send()
        .await;
    assert!(abandoned.is_err());

    let response = ctx
        .post_form("/login/request-otp", &[("email", "ada@example.com")])
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("A request is already in progress.")
    );

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let response = ctx
        .post_form("/login/request-otp", &[("email", "ada@example.com")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("action=\"/login/verify\""));
}

#[tokio::test]
async fn test_wrong_code_stays_on_code_step() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;
    ctx.mock_json(
        "POST",
        "/api/auth/verify-otp",
        400,
        json!({ "error": "Invalid or expired OTP" }),
    )
    .await;

    let response = ctx.post_form("/login/verify", &[("otp", "000000")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(session_set_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid or expired OTP"));
    assert!(body.contains("value=\"000000\""));
    assert!(body.contains("action=\"/login/verify\""));
}

#[tokio::test]
async fn test_verify_without_token_starts_over() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;
    ctx.mock_json("POST", "/api/auth/verify-otp", 200, professional_json())
        .await;

    let response = ctx.post_form("/login/verify", &[("otp", "123456")]).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(session_set_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("Could not start a session. Please try again."));
    assert!(body.contains("action=\"/login/request-otp\""));
}

// ============================================================================
// Step Transitions
// ============================================================================

#[tokio::test]
async fn test_resend_keeps_code_step_with_latest_message() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/request-otp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "First code sent" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&ctx.backend)
        .await;
    ctx.mock_json(
        "POST",
        "/api/auth/request-otp",
        200,
        json!({ "message": "Another code sent" }),
    )
    .await;

    ctx.post_form("/login/request-otp", &[("email", "ada@example.com")])
        .await;

    for _ in 0..2 {
        let response = ctx.post_form("/login/resend", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains("Another code sent"));
        assert!(!body.contains("First code sent"));
        assert!(body.contains("action=\"/login/verify\""));
    }
}

#[tokio::test]
async fn test_change_email_returns_to_email_step() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;

    let response = ctx.post_form("/login/change-email", &[]).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("action=\"/login/request-otp\""));
    assert!(body.contains("value=\"ada@example.com\""));
}

#[tokio::test]
async fn test_verify_without_challenge_is_sent_back() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.backend)
        .await;

    let response = ctx.post_form("/login/verify", &[("otp", "123456")]).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response.text().await.unwrap();
    assert!(body.contains("action=\"/login/request-otp\""));
}

#[tokio::test]
async fn test_login_flow_is_per_browser() {
    let ctx = TestContext::new().await;
    ctx.start_login("ada@example.com").await;

    let other = ctx.fresh_client();
    let body = other
        .get(ctx.url("/login"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("action=\"/login/request-otp\""));
    assert!(!body.contains("ada@example.com"));
}
