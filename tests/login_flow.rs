mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{fail, ok, MockBackend};
use serde_json::json;
use shop_admin::auth::{self, LoginFlow, LoginOutcome, LoginStep};
use shop_admin::config::LoginVariant;
use shop_admin::{AdminError, AdminEvent, Route};

fn respond(req: &common::Recorded) -> (StatusCode, serde_json::Value) {
    let body = req.json();
    match req.path() {
        "auth/login" if body["password"] != "secret" => fail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
        "auth/login" => match body.get("otp").and_then(|v| v.as_str()) {
            None => (StatusCode::OK, json!({ "message": "Code sent to your email" })),
            Some("123456") => ok(json!({ "token": "fresh-token", "user": { "email": body["email"], "full_name": "Chu Shop", "role": "admin" } })),
            Some(_) => fail(StatusCode::BAD_REQUEST, "Wrong code"),
        },
        "auth/send-otp" => (StatusCode::OK, json!({ "message": "Code sent" })),
        "auth/logout" => (StatusCode::OK, json!({})),
        _ => fail(StatusCode::NOT_FOUND, "not found"),
    }
}

#[tokio::test]
async fn test_two_step_login_keeps_email() {
    let backend = MockBackend::start(respond).await;
    let api = backend.client(None);
    let mut flow = LoginFlow::new(api.clone(), Some("/orders/pending".into()));

    let outcome = flow.submit_credentials(" owner@shop.vn ", "secret").await.unwrap();
    assert_eq!(outcome, LoginOutcome::CodeSent { message: "Code sent to your email".into() });
    assert_eq!(flow.step(), &LoginStep::AwaitingOtp { email: "owner@shop.vn".into() });
    assert!(!api.session().is_signed_in());

    let err = flow.submit_otp("000000", None).await.unwrap_err();
    assert_eq!(err.user_message(), "Wrong code");
    assert_eq!(flow.email(), Some("owner@shop.vn"));

    let outcome = flow.submit_otp("123456", None).await.unwrap();
    assert_eq!(
        outcome,
        LoginOutcome::SignedIn {
            route: Route::Orders(shop_admin::domain::OrderStatus::Pending),
            event: AdminEvent::SignedIn { email: "owner@shop.vn".into() },
        }
    );
    let session = api.session().current().unwrap();
    assert_eq!(session.token, "fresh-token");
    assert_eq!(session.display_name.as_deref(), Some("Chu Shop"));

    let second = &backend.requests()[2];
    assert_eq!(second.json()["email"], "owner@shop.vn");
    assert_eq!(second.json()["otp"], "123456");
}

#[tokio::test]
async fn test_bad_credentials_show_backend_message() {
    let backend = MockBackend::start(respond).await;
    let api = backend.client(None);
    let mut flow = LoginFlow::new(api.clone(), None);
    match flow.submit_credentials("owner@shop.vn", "nope").await {
        Err(AdminError::Rejected { status: 401, message }) => assert_eq!(message, "Invalid email or password"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(flow.step(), &LoginStep::Credentials);
    assert!(!api.session().is_signed_in());
}

#[tokio::test]
async fn test_invalid_email_never_reaches_backend() {
    let backend = MockBackend::start(respond).await;
    let mut flow = LoginFlow::new(backend.client(None), None);
    match flow.submit_credentials("not-an-email", "secret").await {
        Err(AdminError::Validation(errors)) => assert!(errors.has("email")),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(flow.submit_otp("12ab56", None).await, Err(AdminError::Validation(_))));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_send_code_first_and_cooldown() {
    let backend = MockBackend::start(respond).await;
    let mut flow = LoginFlow::new(backend.client(None), None).with_variant(LoginVariant::SendCodeFirst);

    assert!(matches!(flow.send_code("owner@shop.vn").await.unwrap(), LoginOutcome::CodeSent { .. }));
    assert!(flow.cooldown_remaining() > Duration::from_secs(50));
    match flow.resend_code().await {
        Err(AdminError::Cooldown { remaining_secs }) => assert!(remaining_secs > 50),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.count("POST", "auth/send-otp"), 1);

    let outcome = flow.submit_otp("123456", Some("secret")).await.unwrap();
    assert!(matches!(outcome, LoginOutcome::SignedIn { route: Route::Dashboard, .. }));
}

#[tokio::test]
async fn test_login_times_out() {
    let backend = MockBackend::start_with_delay(Duration::from_millis(500), respond).await;
    let mut config = backend.config();
    config.login_timeout = Duration::from_millis(50);
    let mut flow = LoginFlow::new(backend.client_with(config, None), None);
    assert!(matches!(flow.submit_credentials("owner@shop.vn", "secret").await, Err(AdminError::Timeout)));
}

#[tokio::test]
async fn test_logout_drops_session() {
    let backend = MockBackend::start(respond).await;
    let api = backend.client(Some("good-token"));
    assert_eq!(auth::logout(&api).await, AdminEvent::SignedOut);
    assert!(!api.session().is_signed_in());
    assert_eq!(backend.count("POST", "auth/logout"), 1);
}
