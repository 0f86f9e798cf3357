use axum::http::StatusCode;
use modkit::api::problem::{self, Problem, ProblemResponse};

use crate::api::rest::dto::QueueEntryDto;
use crate::domain::error::DomainError;

pub fn map_domain_error(e: &DomainError) -> ProblemResponse {
    match e {
        DomainError::AlreadyInQueue { existing } => {
            let data = serde_json::to_value(QueueEntryDto::from((**existing).clone()))
                .unwrap_or(serde_json::Value::Null);
            Problem::from_parts(
                StatusCode::BAD_REQUEST,
                "QUEUE_ALREADY_JOINED",
                "You are already in a queue",
            )
            .with_data(data)
            .into()
        }
        DomainError::NotInQueue => problem::not_found("You are not currently in any queue"),
        DomainError::NoPatientsWaiting { .. } => problem::not_found("No patients in queue"),
        DomainError::Identity { .. } | DomainError::Database { .. } => {
            tracing::error!(error = %e, "queues request failed");
            problem::internal_error()
        }
    }
}
