use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Notification not found: {id}")]
    NotFound { id: Uuid },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound { id }
    }

    pub fn database(e: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{e:#}"),
        }
    }
}
