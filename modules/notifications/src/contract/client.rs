use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::error::NotificationsError;

/// In-process API of the notifications module.
#[async_trait]
pub trait NotificationsApi: Send + Sync {
    async fn unread_count(&self, user_id: Uuid) -> Result<u64, NotificationsError>;

    /// Nudge the dispatcher after committing staged notifications.
    fn wake_dispatcher(&self);
}
