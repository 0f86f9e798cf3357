use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::AppointmentStatus;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Appointment not found: {id}")]
    NotFound { id: Uuid },

    #[error("Appointment date must be in the future")]
    DateInPast,

    #[error("Invalid {field}: '{value}'")]
    InvalidInput { field: &'static str, value: String },

    #[error("Cannot modify {status} appointment")]
    NotModifiable { status: AppointmentStatus },

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel completed appointment")]
    CancelCompleted,

    #[error("Cannot complete {status} appointment")]
    NotCompletable { status: AppointmentStatus },

    #[error("Appointment {id} was changed concurrently")]
    Conflict { id: Uuid },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound { id }
    }

    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            value: value.into(),
        }
    }

    pub fn database(e: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_keep_the_whole_context_chain() {
        let cause = anyhow::anyhow!("no such table: appointments").context("list appointments");
        let err = DomainError::database(cause);
        assert_eq!(
            err.to_string(),
            "Database error: list appointments: no such table: appointments"
        );
    }
}
