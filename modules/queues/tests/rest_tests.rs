mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{NoopRegistry, Profiles, RoleTokens, WakeCounter, HOSPITAL};
use queues::api::rest::handlers::PageLimits;
use queues::api::rest::routes::register_routes;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn app_with(profiles: Profiles, debug_endpoint: bool) -> Router {
    let db = common::setup_db().await;
    let svc = common::service(&db, profiles, Arc::new(WakeCounter::default()));
    register_routes(
        Router::new(),
        &NoopRegistry,
        svc,
        Arc::new(RoleTokens),
        PageLimits { default: 10, max: 100 },
        debug_endpoint,
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn join_body(specialty: &str) -> Value {
    json!({ "hospitalName": HOSPITAL, "specialty": specialty, "priority": "urgent" })
}

#[tokio::test]
async fn join_status_and_leave() {
    let app = app_with(Profiles::default(), false).await;
    let first = format!("patient:{}", Uuid::new_v4());
    let second = format!("patient:{}", Uuid::new_v4());

    let (status, body) = send(&app, "POST", "/api/queues/join", Some(join_body("Cardiology")), &first).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Successfully joined the queue");
    assert_eq!(body["data"]["queueNumber"], "C-001");
    assert_eq!(body["data"]["priority"], "urgent");

    let (_, body) = send(&app, "POST", "/api/queues/join", Some(join_body("Cardiology")), &second).await;
    assert_eq!(body["data"]["position"], 2);
    assert_eq!(body["data"]["estimatedWaitTime"], 15);

    let (status, dup) = send(&app, "POST", "/api/queues/join", Some(join_body("Cardiology")), &first).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(dup["message"], "You are already in a queue");
    assert_eq!(dup["data"]["queueNumber"], "C-001");

    let (status, body) = send(&app, "GET", "/api/queues/status", None, &second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["queueStats"]["totalInQueue"], 2);
    assert_eq!(body["data"]["queueStats"]["aheadInQueue"], 1);

    let (status, body) = send(&app, "DELETE", "/api/queues/leave", None, &first).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully left the queue");
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) = send(&app, "GET", "/api/queues/status", None, &second).await;
    assert_eq!(body["data"]["position"], 1);
    assert_eq!(body["data"]["queueStats"]["estimatedWaitTime"], 0);

    let (status, body) = send(&app, "GET", "/api/queues/status", None, &first).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "You are not currently in any queue");

    let (_, body) = send(&app, "GET", "/api/queues/history?limit=5", None, &first).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn join_payload_is_validated() {
    let app = app_with(Profiles::default(), false).await;
    let patient = format!("patient:{}", Uuid::new_v4());

    let (status, body) = send(
        &app,
        "POST",
        "/api/queues/join",
        Some(json!({"hospitalName": "", "specialty": "Cardiology", "priority": "critical"})),
        &patient,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn staff_calls_the_next_patient() {
    let patient_id = Uuid::new_v4();
    let app = app_with(Profiles::with(&[(patient_id, "Amara", "Okafor")]), false).await;
    let patient = format!("patient:{patient_id}");
    let staff = format!("staff:{}", Uuid::new_v4());
    send(&app, "POST", "/api/queues/join", Some(join_body("Cardiology")), &patient).await;

    let (status, body) = send(&app, "GET", "/api/queues/hospital", None, &staff).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Hospital name is required");

    let (status, body) = send(
        &app,
        "GET",
        "/api/queues/hospital?hospitalName=General%20Hospital",
        None,
        &staff,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["patient"]["firstName"], "Amara");
    assert_eq!(body["data"][0]["queueNumber"], "C-001");

    let (status, body) = send(&app, "POST", "/api/queues/call-next", Some(json!({"hospitalName": HOSPITAL})), &staff).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Hospital name and specialty are required");

    let target = json!({"hospitalName": HOSPITAL, "specialty": "Cardiology"});
    let (status, body) = send(&app, "POST", "/api/queues/call-next", Some(target.clone()), &staff).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Next patient called successfully");
    assert_eq!(body["data"]["status"], "called");
    assert!(body["data"]["calledAt"].is_string());

    let (status, body) = send(&app, "POST", "/api/queues/call-next", Some(target), &staff).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No patients in queue");

    let (_, board) = send(&app, "GET", "/api/queues/all?hospitalName=General%20Hospital", None, &patient).await;
    let row = &board["data"][0];
    assert_eq!(row["patientName"], "Amara Okafor");
    assert_eq!(row["status"], "called");
    assert!(row.get("patientId").is_none());
    assert!(row.get("email").is_none());
}

#[tokio::test]
async fn routes_are_role_gated() {
    let app = app_with(Profiles::default(), false).await;
    let patient = format!("patient:{}", Uuid::new_v4());
    let staff = format!("staff:{}", Uuid::new_v4());

    let (status, _) = send(&app, "POST", "/api/queues/call-next", Some(json!({})), &patient).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "POST", "/api/queues/join", Some(join_body("Cardiology")), &staff).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", "/api/queues/status", None, "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn debug_dump_is_opt_in() {
    let patient = format!("patient:{}", Uuid::new_v4());

    let closed = app_with(Profiles::default(), false).await;
    let (status, _) = send(&closed, "GET", "/api/queues/debug", None, &patient).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let open = app_with(Profiles::default(), true).await;
    send(&open, "POST", "/api/queues/join", Some(join_body("Cardiology")), &patient).await;
    let (status, body) = send(&open, "GET", "/api/queues/debug", None, &patient).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["entries"][0]["queueNumber"], "C-001");
}
