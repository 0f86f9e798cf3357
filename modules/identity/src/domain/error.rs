use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Email already registered")]
    EmailAlreadyRegistered { email: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Token error: {message}")]
    Token { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn user_not_found(id: Uuid) -> Self {
        Self::UserNotFound { id }
    }

    pub fn email_already_registered(email: impl Into<String>) -> Self {
        Self::EmailAlreadyRegistered {
            email: email.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(e: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{e:#}"),
        }
    }

    pub fn token(e: impl std::fmt::Display) -> Self {
        Self::Token {
            message: format!("{e:#}"),
        }
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: format!("{e:#}"),
        }
    }
}
