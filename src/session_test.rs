use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::timeout;

use super::*;
use crate::broadcast::BroadcastHub;
use crate::config::AuthMode;
use crate::error::ErrorKind;
use crate::navigator::{LOGIN_EXPIRED_ROUTE, LOGIN_ROUTE, LOGIN_UNAUTHORIZED_ROUTE};
use crate::testutil::{Fixture, MockBackend, MockReply, fixture, fresh_jwt};

async fn mounted(fx: &Fixture) -> AuthContext {
    let ctx = fx.state.mount_context(&BroadcastHub::new());
    timeout(Duration::from_millis(1000), ctx.settled()).await.expect("initial check did not settle");
    ctx
}

fn credentials() -> Credentials {
    Credentials::new("knight@example.com", "hunter2")
}

// =============================================================================
// NOTICES
// =============================================================================

#[test]
fn notice_from_query_flags() {
    assert_eq!(LoginNotice::from_query("expired=true"), Some(LoginNotice::SessionExpired));
    assert_eq!(LoginNotice::from_query("?unauthorized=true"), Some(LoginNotice::Unauthorized));
    assert_eq!(LoginNotice::from_query("unauthorized=1&expired=true"), Some(LoginNotice::SessionExpired));
    assert_eq!(LoginNotice::from_query("expired="), None);
    assert_eq!(LoginNotice::from_query("next=/account"), None);
    assert_eq!(LoginNotice::from_query(""), None);
}

#[test]
fn notice_from_redirect_locations() {
    assert_eq!(LoginNotice::from_location(LOGIN_EXPIRED_ROUTE), Some(LoginNotice::SessionExpired));
    assert_eq!(LoginNotice::from_location(LOGIN_UNAUTHORIZED_ROUTE), Some(LoginNotice::Unauthorized));
    assert_eq!(LoginNotice::from_location(LOGIN_ROUTE), None);
    assert_eq!(LoginNotice::SessionExpired.to_string(), EXPIRED_NOTICE);
}

#[test]
fn credentials_debug_hides_password() {
    let rendered = format!("{:?}", credentials());
    assert!(rendered.contains("knight@example.com"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn code_validation() {
    assert!(is_valid_code("012345"));
    assert!(!is_valid_code("12345"));
    assert!(!is_valid_code("1234567"));
    assert!(!is_valid_code("12a456"));
    assert!(!is_valid_code("１２３４５６"));
}

#[test]
fn second_factor_rejection_detection() {
    assert!(is_second_factor_rejection(&ApiError::request(401, Some("Invalid 2FA token".into()))));
    assert!(is_second_factor_rejection(&ApiError::request(400, Some("2FA token required".into()))));
    assert!(!is_second_factor_rejection(&ApiError::request(401, Some("Invalid email or password".into()))));
    assert!(!is_second_factor_rejection(&ApiError::new(ErrorKind::Transport, None, "2FA service unreachable")));
}

// =============================================================================
// OPEN
// =============================================================================

#[tokio::test]
async fn open_redirects_settled_session_to_account() {
    let fx = fixture("http://localhost:8080/api", AuthMode::LocalCredential, LOGIN_ROUTE);
    let form = LoginForm::new(&fx.state);

    let notice = form.open(LOGIN_ROUTE, AuthState { is_authenticated: true, is_loading: false });

    assert_eq!(notice, None);
    assert_eq!(fx.navigator.location(), ACCOUNT_ROUTE);
}

#[tokio::test]
async fn open_keeps_user_on_login_while_loading_or_with_notice() {
    let fx = fixture("http://localhost:8080/api", AuthMode::LocalCredential, LOGIN_ROUTE);
    let form = LoginForm::new(&fx.state);

    assert_eq!(form.open(LOGIN_ROUTE, AuthState::LOADING), None);
    let notice = form.open(LOGIN_EXPIRED_ROUTE, AuthState { is_authenticated: true, is_loading: false });

    assert_eq!(notice, Some(LoginNotice::SessionExpired));
    assert!(fx.navigator.history().is_empty());
}

// =============================================================================
// SUBMIT
// =============================================================================

#[tokio::test]
async fn login_persists_token_and_authorizes_later_calls() {
    let backend = MockBackend::start().await;
    let token = fresh_jwt();
    backend.on("POST", "/login", MockReply::json(200, &json!({"token": token, "requires2FA": false})));
    backend.on("GET", "/account", MockReply::json(200, &json!({"data": {"email": "knight@example.com"}})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);

    let outcome = form.submit(&credentials(), None, &ctx).await.unwrap();

    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert_eq!(fx.state.auth.get_token(), Some(token.clone()));
    assert!(ctx.is_authenticated());
    assert_eq!(fx.navigator.location(), ACCOUNT_ROUTE);
    let login = backend.last_request("/login").unwrap();
    assert!(login.header("authorization").is_none());
    assert_eq!(login.json(), json!({"email": "knight@example.com", "password": "hunter2"}));

    let _: Value = fx.state.api.get("/account", RequestOptions::default()).await.unwrap();
    let account = backend.last_request("/account").unwrap();
    assert_eq!(account.header("authorization"), Some(format!("Bearer {token}")));
}

#[tokio::test]
async fn cookie_mode_login_persists_nothing() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/login", MockReply::json(200, &json!({"message": "Login successful"})));
    backend.on("GET", "/account", MockReply::json(401, &json!({"message": "unauthorized"})));
    let fx = fixture(&backend.api_url, AuthMode::CookieSession, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);

    let outcome = form.submit(&credentials(), None, &ctx).await.unwrap();

    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert!(fx.storage.is_empty());
    assert!(ctx.is_authenticated());
}

#[tokio::test]
async fn second_factor_round_trip() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/login", MockReply::json(200, &json!({"requires2FA": true})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);

    let outcome = form.submit(&credentials(), Some("999999"), &ctx).await.unwrap();

    assert_eq!(outcome, LoginOutcome::TwoFactorRequired);
    assert!(form.requires_two_factor());
    assert!(fx.storage.is_empty());
    assert!(fx.navigator.history().is_empty());
    assert!(!ctx.is_authenticated());
    // The code is not sent before the backend asks for it.
    assert!(backend.last_request("/login").unwrap().json().get("token").is_none());

    let token = fresh_jwt();
    backend.on("POST", "/login", MockReply::json(200, &json!({"token": token})));
    let outcome = form.submit(&credentials(), Some("123456"), &ctx).await.unwrap();

    assert_eq!(outcome, LoginOutcome::Authenticated);
    assert!(!form.requires_two_factor());
    assert_eq!(backend.last_request("/login").unwrap().json()["token"], json!("123456"));
    assert_eq!(fx.state.auth.get_token(), Some(token));
}

#[tokio::test]
async fn malformed_code_is_rejected_locally() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/login", MockReply::json(200, &json!({"requires2FA": true})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);
    form.submit(&credentials(), None, &ctx).await.unwrap();

    for code in [None, Some("12345"), Some("abcdef")] {
        let err = form.submit(&credentials(), code, &ctx).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidCode));
    }

    assert_eq!(backend.hits("/login"), 1);
    assert!(form.requires_two_factor());
}

#[tokio::test]
async fn wrong_code_keeps_second_factor_mode() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/login", MockReply::json(200, &json!({"requires2FA": true})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);
    form.submit(&credentials(), None, &ctx).await.unwrap();

    backend.on("POST", "/login", MockReply::json(401, &json!({"message": "Invalid 2FA token"})));
    let err = form.submit(&credentials(), Some("000000"), &ctx).await.unwrap_err();

    let LoginError::Api(api) = err else { panic!("expected api error") };
    assert_eq!(api.kind(), ErrorKind::Request);
    assert_eq!(api.message(), "Invalid 2FA token");
    assert!(form.requires_two_factor());
    // A public 401 never triggers the unauthorized redirect.
    assert!(fx.navigator.history().is_empty());
}

#[tokio::test]
async fn other_errors_leave_second_factor_mode() {
    let backend = MockBackend::start().await;
    backend.on("POST", "/login", MockReply::json(200, &json!({"requires2FA": true})));
    let fx = fixture(&backend.api_url, AuthMode::LocalCredential, LOGIN_ROUTE);
    let ctx = mounted(&fx).await;
    let mut form = LoginForm::new(&fx.state);
    form.submit(&credentials(), None, &ctx).await.unwrap();

    backend.on("POST", "/login", MockReply::json(401, &json!({"message": "Invalid email or password"})));
    let err = form.submit(&credentials(), Some("000000"), &ctx).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(!form.requires_two_factor());
    assert!(!ctx.is_authenticated());
}
