use modkit::api::problem::{self, ProblemResponse};

use crate::domain::error::DomainError;

pub fn map_domain_error(e: &DomainError) -> ProblemResponse {
    match e {
        DomainError::NotFound { .. } => problem::not_found("Notification not found"),
        DomainError::Database { .. } => {
            tracing::error!(error = %e, "notifications request failed");
            problem::internal_error()
        }
    }
}
