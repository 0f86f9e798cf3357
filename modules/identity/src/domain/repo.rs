use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::model::User;

/// Persistence port for users.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Match on normalized email or on the raw phone number.
    async fn find_by_login(&self, email_or_phone: &str) -> anyhow::Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    /// Fails when the email is already taken (unique index).
    async fn insert(&self, user: User) -> anyhow::Result<()>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    /// Single conditional update: replaces the password and clears the reset token
    /// only while `digest` is current and unexpired at `now`. Returns whether a
    /// row was updated.
    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> anyhow::Result<bool>;
}
