use chrono::{DateTime, Utc};
use modkit::Role;
use uuid::Uuid;

use crate::contract::model::UserProfile;

/// Stored user including credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub hospital_name: Option<String>,
    /// SHA-256 hex digest of the outstanding reset token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            hospital_name: self.hospital_name.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
    pub hospital_name: Option<String>,
}

/// Issued bearer token together with the profile it was issued for.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

/// Lower-cased and trimmed, as stored.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
