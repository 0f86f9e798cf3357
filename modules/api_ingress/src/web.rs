use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Unmatched routes answer with the problem envelope instead of an empty 404.
pub async fn route_not_found() -> impl IntoResponse {
    modkit::api::problem::not_found("Route not found").into_response()
}

pub async fn method_not_allowed() -> impl IntoResponse {
    modkit::api::problem::ProblemResponse(modkit::api::Problem::from_parts(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        "Method not allowed",
    ))
}
