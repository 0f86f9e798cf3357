use thiserror::Error;

use crate::contract::model::QueueEntry;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Carries the entry the patient already holds.
    #[error("Patient already holds queue entry {}", existing.id)]
    AlreadyInQueue { existing: Box<QueueEntry> },

    #[error("Patient is not in any queue")]
    NotInQueue,

    #[error("No patients waiting in {hospital} / {specialty}")]
    NoPatientsWaiting { hospital: String, specialty: String },

    #[error("Patient lookup failed: {message}")]
    Identity { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn database(e: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{e:#}"),
        }
    }

    pub fn identity(e: impl std::fmt::Display) -> Self {
        Self::Identity {
            message: format!("{e:#}"),
        }
    }
}
