use axum::http::StatusCode;
use modkit::api::problem::{self, FieldError, Problem, ProblemResponse};

use crate::domain::error::DomainError;

pub fn map_domain_error(e: &DomainError) -> ProblemResponse {
    match e {
        DomainError::NotFound { .. } => problem::not_found("Appointment not found"),
        DomainError::DateInPast => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "APPOINTMENT_DATE_IN_PAST",
            "Appointment date must be in the future",
        )
        .into(),
        DomainError::InvalidInput { field, value } => problem::validation_failed(vec![
            FieldError::new(*field, format!("Invalid {field} '{value}'")),
        ]),
        DomainError::NotModifiable { .. } => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "APPOINTMENT_NOT_MODIFIABLE",
            "Cannot modify completed or cancelled appointments",
        )
        .into(),
        DomainError::AlreadyCancelled => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "APPOINTMENT_ALREADY_CANCELLED",
            "Appointment is already cancelled",
        )
        .into(),
        DomainError::CancelCompleted => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "APPOINTMENT_COMPLETED",
            "Cannot cancel completed appointment",
        )
        .into(),
        DomainError::NotCompletable { .. } => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "APPOINTMENT_NOT_COMPLETABLE",
            "Only scheduled appointments can be completed",
        )
        .into(),
        DomainError::Conflict { .. } => {
            problem::conflict("Appointment was changed by another request; reload and retry")
        }
        DomainError::Database { .. } => {
            tracing::error!(error = %e, "appointments request failed");
            problem::internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::AppointmentStatus;
    use uuid::Uuid;

    #[test]
    fn terminal_state_errors_are_bad_requests() {
        for e in [
            DomainError::NotModifiable {
                status: AppointmentStatus::Completed,
            },
            DomainError::AlreadyCancelled,
            DomainError::CancelCompleted,
        ] {
            assert_eq!(map_domain_error(&e).0.status, 400);
        }
        assert_eq!(
            map_domain_error(&DomainError::not_found(Uuid::nil())).0.status,
            404
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn database_errors_are_opaque() {
        let p = map_domain_error(&DomainError::database("disk I/O error")).0;
        assert_eq!(p.status, 500);
        assert_eq!(p.message, "Internal server error");
        assert!(logs_contain("disk I/O error"));
    }

    #[test]
    fn invalid_input_names_the_field() {
        let p = map_domain_error(&DomainError::invalid("status", "pending")).0;
        let errors = p.errors.unwrap();
        assert_eq!(errors[0].field, "status");
    }
}
