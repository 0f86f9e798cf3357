use thiserror::Error;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentsError {
    #[error("Appointment not found: {id}")]
    NotFound { id: Uuid },

    #[error("Internal error")]
    Internal,
}

impl From<DomainError> for AppointmentsError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { id } => Self::NotFound { id },
            other => {
                tracing::debug!(error = %other, "appointments error hidden from caller");
                Self::Internal
            }
        }
    }
}
