use chrono::{DateTime, Utc};
use modkit::Role;
use uuid::Uuid;

/// Public view of a user for other modules; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    /// Staff only.
    pub hospital_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
