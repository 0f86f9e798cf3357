use async_trait::async_trait;

use crate::domain::model::User;

/// Outgoing mail. Delivery failures are reported but never fail the caller's action.
#[async_trait]
pub trait MailerPort: Send + Sync {
    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()>;
}

/// Signs bearer tokens for a user.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> anyhow::Result<String>;
}
