use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success envelope: `{success: true, message?, data, pagination?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// 1-based page number.
    pub current: u64,
    pub pages: u64,
    pub total: u64,
}

impl Pagination {
    pub fn new(current: u64, limit: u64, total: u64) -> Self {
        Self {
            current,
            pages: total.div_ceil(limit.max(1)),
            total,
        }
    }
}

/// Page request after clamping; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Missing or zero values fall back to page 1 / `default_limit`; `limit` is capped at `max_limit`.
    pub fn clamp(page: Option<u64>, limit: Option<u64>, default_limit: u64, max_limit: u64) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(default_limit)
                .min(max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

pub fn ok_json<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

pub fn ok_message<T: Serialize>(message: &str, data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data).with_message(message))).into_response()
}

pub fn created_json<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(data).with_message(message)),
    )
        .into_response()
}

pub fn page_json<T: Serialize>(data: Vec<T>, pagination: Pagination) -> Response {
    (StatusCode::OK, Json(ApiResponse::paginated(data, pagination))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_empty_optionals() {
        let v = serde_json::to_value(ApiResponse::ok(serde_json::json!({ "id": 1 }))).unwrap();
        assert_eq!(v, serde_json::json!({ "success": true, "data": { "id": 1 } }));
    }

    #[test]
    fn paginated_envelope() {
        let v = serde_json::to_value(ApiResponse::paginated(vec![1, 2], Pagination::new(2, 2, 5)))
            .unwrap();
        assert_eq!(v["pagination"]["current"], 2);
        assert_eq!(v["pagination"]["pages"], 3);
        assert_eq!(v["pagination"]["total"], 5);
    }

    #[test]
    fn page_request_clamps() {
        assert_eq!(
            PageRequest::clamp(None, None, 10, 100),
            PageRequest { page: 1, limit: 10 }
        );
        assert_eq!(
            PageRequest::clamp(Some(0), Some(500), 10, 100),
            PageRequest { page: 1, limit: 100 }
        );
        assert_eq!(PageRequest::clamp(Some(3), Some(20), 10, 100).offset(), 40);
    }

    #[test]
    fn zero_total_has_zero_pages() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
    }
}
