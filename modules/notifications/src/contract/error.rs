use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationsError {
    #[error("Notification not found")]
    NotFound,

    #[error("Internal error")]
    Internal,
}

impl From<DomainError> for NotificationsError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { .. } => Self::NotFound,
            DomainError::Database { .. } => Self::Internal,
        }
    }
}
