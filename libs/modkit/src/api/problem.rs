use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 Problem Details, extended with the `{success:false, message}` envelope
/// fields every API error carries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(title = "Problem", description = "Error envelope (RFC 9457 Problem Details)")]
pub struct Problem {
    /// Always `false`.
    pub success: bool,
    /// Human-readable explanation of this occurrence.
    pub message: String,
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    /// Machine-readable error code, e.g. `QUEUE_ALREADY_JOINED`.
    pub code: String,
    /// Request path that produced the problem.
    pub instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Field-level validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Related resource, e.g. the existing queue entry on a duplicate join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(title = "FieldError")]
pub struct FieldError {
    /// Dotted path of the offending field (`patientInfo.phoneNumber`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            code: String::new(),
            instance: String::new(),
            request_id: None,
            errors: None,
            data: None,
        }
    }

    /// Status plus a machine code; the title is the canonical reason phrase.
    pub fn from_parts(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self::new(
            status,
            status.canonical_reason().unwrap_or("Error"),
            message,
        )
        .with_code(code)
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Renders a [`Problem`] with its status and `application/problem+json`.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let mut resp = axum::Json(self.0).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

pub fn bad_request(message: impl Into<String>) -> ProblemResponse {
    Problem::from_parts(StatusCode::BAD_REQUEST, "BAD_REQUEST", message).into()
}

pub fn validation_failed(errors: Vec<FieldError>) -> ProblemResponse {
    Problem::from_parts(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Validation failed")
        .with_errors(errors)
        .into()
}

pub fn unauthorized(message: impl Into<String>) -> ProblemResponse {
    Problem::from_parts(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message).into()
}

pub fn forbidden(message: impl Into<String>) -> ProblemResponse {
    Problem::from_parts(StatusCode::FORBIDDEN, "FORBIDDEN", message).into()
}

pub fn not_found(message: impl Into<String>) -> ProblemResponse {
    Problem::from_parts(StatusCode::NOT_FOUND, "NOT_FOUND", message).into()
}

pub fn conflict(message: impl Into<String>) -> ProblemResponse {
    Problem::from_parts(StatusCode::CONFLICT, "CONFLICT", message).into()
}

/// The message never carries internals; log the cause before calling this.
pub fn internal_error() -> ProblemResponse {
    Problem::from_parts(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal server error",
    )
    .into()
}
