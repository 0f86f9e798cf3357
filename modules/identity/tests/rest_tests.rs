mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{NoopRegistry, RecordingMailer};
use identity::api::rest::routes::register_routes;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> (Router, Arc<RecordingMailer>) {
    let db = common::setup_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let svc = common::service(&db, mailer.clone());
    let router = register_routes(Router::new(), &NoopRegistry, svc, common::codec()).unwrap();
    (router, mailer)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn register_body(email: &str) -> Value {
    json!({
        "firstName": "Amara",
        "lastName": "Okafor",
        "email": email,
        "phone": "08012345678",
        "password": "password123",
        "role": "patient"
    })
}

#[tokio::test]
async fn register_then_me() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "amara@example.com");
    assert_eq!(body["data"]["user"]["role"], "patient");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, me) = send(&app, "GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["firstName"], "Amara");
}

#[tokio::test]
async fn duplicate_registration_is_409() {
    let (app, _) = app().await;
    send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;
    let (status, body) = send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn invalid_registration_lists_field_errors() {
    let (app, _) = app().await;
    let mut body = register_body("not-an-email");
    body["password"] = json!("short");
    let (status, problem) = send(&app, "POST", "/api/auth/register", Some(body), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = problem["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn bad_login_is_401_with_generic_message() {
    let (app, _) = app().await;
    send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"emailOrPhone": "amara@example.com", "password": "wrong-password"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({"emailOrPhone": "08012345678", "password": "password123"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn forgot_password_answers_the_same_for_unknown_accounts() {
    let (app, _) = app().await;
    send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;

    let (s1, known) = send(&app, "POST", "/api/auth/forgot-password", Some(json!({"email": "amara@example.com"})), None).await;
    let (s2, unknown) = send(&app, "POST", "/api/auth/forgot-password", Some(json!({"email": "ghost@example.com"})), None).await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn reset_password_flow_over_http() {
    let (app, mailer) = app().await;
    send(&app, "POST", "/api/auth/register", Some(register_body("amara@example.com")), None).await;
    send(&app, "POST", "/api/auth/forgot-password", Some(json!({"email": "amara@example.com"})), None).await;
    let token = mailer.last_reset_token().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(json!({"token": token, "password": "brand-new-pass"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset successfully");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/reset-password",
        Some(json!({"token": token, "password": "another-pass"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn me_requires_a_token() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided");

    let (status, _) = send(&app, "GET", "/api/auth/me", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
