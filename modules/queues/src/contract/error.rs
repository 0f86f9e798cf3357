use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueuesError {
    #[error("Patient is not in any queue")]
    NotInQueue,

    #[error("Internal error")]
    Internal,
}

impl From<DomainError> for QueuesError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotInQueue => Self::NotInQueue,
            other => {
                tracing::debug!(error = %other, "queues error hidden from caller");
                Self::Internal
            }
        }
    }
}
