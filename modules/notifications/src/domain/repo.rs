use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::Notification;

#[async_trait]
pub trait NotificationsRepository: Send + Sync {
    /// Newest first; returns the page and the total matching count.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Notification>, u64)>;

    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<u64>;

    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_read(
        &self,
        user_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Notification>>;

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Outbox row eligible for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelivery {
    pub id: Uuid,
    pub attempts: u32,
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Undispatched rows due at `now` with fewer than `max_attempts` failures, oldest first.
    async fn due(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
        limit: u64,
    ) -> anyhow::Result<Vec<PendingDelivery>>;

    /// Materializes one row and marks it dispatched in a single transaction.
    /// Returns `false` when another dispatcher got there first.
    async fn deliver(&self, id: Uuid, now: DateTime<Utc>) -> anyhow::Result<bool>;

    async fn record_failure(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> anyhow::Result<()>;
}
