//! Fills `instance` and `request_id` of outgoing problem responses, so handlers
//! only decide status, code and message.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::api::problem::{Problem, APPLICATION_PROBLEM_JSON};

const MAX_PROBLEM_BODY: usize = 64 * 1024;

pub async fn problem_context_middleware(request: Request, next: Next) -> Response {
    let instance = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;
    if !is_problem_response(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_PROBLEM_BODY).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer problem body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(mut problem) = serde_json::from_slice::<Problem>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if problem.instance.is_empty() {
        problem.instance = instance;
    }
    if problem.request_id.is_none() {
        problem.request_id = request_id;
    }

    match serde_json::to_vec(&problem) {
        Ok(buf) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
            );
            Response::from_parts(parts, Body::from(buf))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

pub fn is_problem_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with(APPLICATION_PROBLEM_JSON))
        .unwrap_or(false)
}
