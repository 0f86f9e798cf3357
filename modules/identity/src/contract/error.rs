use thiserror::Error;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("User not found: {id}")]
    NotFound { id: Uuid },

    #[error("Internal error")]
    Internal,
}

impl From<DomainError> for IdentityError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UserNotFound { id } => Self::NotFound { id },
            other => {
                tracing::debug!(error = %other, "identity error hidden from caller");
                Self::Internal
            }
        }
    }
}
