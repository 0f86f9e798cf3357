use axum::http::StatusCode;
use modkit::api::problem::{self, Problem, ProblemResponse};

use crate::domain::error::DomainError;

/// Map a domain error to its problem response.
pub fn map_domain_error(e: &DomainError) -> ProblemResponse {
    match e {
        DomainError::UserNotFound { .. } => problem::not_found("User not found"),
        DomainError::EmailAlreadyRegistered { .. } => Problem::from_parts(
            StatusCode::CONFLICT,
            "IDENTITY_EMAIL_TAKEN",
            "Email already registered",
        )
        .into(),
        DomainError::InvalidCredentials => Problem::from_parts(
            StatusCode::UNAUTHORIZED,
            "IDENTITY_INVALID_CREDENTIALS",
            "Invalid credentials",
        )
        .into(),
        DomainError::InvalidResetToken => Problem::from_parts(
            StatusCode::BAD_REQUEST,
            "IDENTITY_INVALID_RESET_TOKEN",
            "Invalid or expired reset token",
        )
        .into(),
        DomainError::Validation { field, message } => {
            problem::validation_failed(vec![problem::FieldError::new(field, message)])
        }
        DomainError::Database { .. }
        | DomainError::Token { .. }
        | DomainError::Internal { .. } => {
            tracing::error!(error = %e, "identity request failed");
            problem::internal_error()
        }
    }
}
