use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower::util::ServiceExt;

use api_ingress::request_id::{header as request_id_header, MakeReqId, XRequestId};

fn test_app() -> Router {
    use axum::middleware::from_fn;
    use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

    let x_request_id = request_id_header();

    Router::new()
        .route("/ticket", get(ticket_handler))
        .route("/missing", get(missing_handler))
        .layer(from_fn(modkit::api::problem_context_middleware))
        .layer(from_fn(api_ingress::request_id::push_req_id_to_extensions))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeReqId))
}

async fn ticket_handler(
    Extension(XRequestId(request_id)): Extension<XRequestId>,
) -> Json<serde_json::Value> {
    Json(json!({"queueNumber": "C-001", "request_id": request_id}))
}

async fn missing_handler() -> Response {
    modkit::api::problem::not_found("You are not in any queue").into_response()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn generates_request_id_when_missing() {
    let response = test_app()
        .oneshot(Request::builder().uri("/ticket").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("x-request-id should be generated");
    assert!(!header_id.is_empty());

    // handlers see the same id through the extension
    let json = body_json(response).await;
    assert_eq!(json["request_id"], header_id);
}

#[tokio::test]
async fn preserves_incoming_request_id() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/ticket")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
}

#[tokio::test]
async fn problem_bodies_carry_request_id_and_instance() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/missing")
                .header("x-request-id", "error-test-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("error-test-123")
    );

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "You are not in any queue");
    assert_eq!(json["request_id"], "error-test-123");
    assert_eq!(json["instance"], "/missing");
}
