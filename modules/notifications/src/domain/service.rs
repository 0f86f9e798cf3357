use std::sync::Arc;

use chrono::Utc;
use modkit::api::{PageRequest, Pagination};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::contract::model::Notification;
use crate::domain::error::DomainError;
use crate::domain::repo::NotificationsRepository;

/// Read side of a user's notification feed.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn NotificationsRepository>,
}

impl Service {
    pub fn new(repo: Arc<dyn NotificationsRepository>) -> Self {
        Self { repo }
    }

    #[instrument(name = "notifications.service.list", skip(self), fields(user_id = %user_id))]
    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<Notification>, Pagination), DomainError> {
        let (items, total) = self
            .repo
            .list_for_user(user_id, unread_only, page.offset(), page.limit)
            .await
            .map_err(DomainError::database)?;
        debug!(returned = items.len(), total, "notifications listed");
        Ok((items, Pagination::new(page.page, page.limit, total)))
    }

    #[instrument(name = "notifications.service.unread_count", skip(self), fields(user_id = %user_id))]
    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, DomainError> {
        self.repo
            .unread_count(user_id)
            .await
            .map_err(DomainError::database)
    }

    #[instrument(
        name = "notifications.service.mark_read",
        skip(self),
        fields(user_id = %user_id, notification_id = %id)
    )]
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification, DomainError> {
        self.repo
            .mark_read(user_id, id, Utc::now())
            .await
            .map_err(DomainError::database)?
            .ok_or_else(|| DomainError::not_found(id))
    }

    #[instrument(name = "notifications.service.mark_all_read", skip(self), fields(user_id = %user_id))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let updated = self
            .repo
            .mark_all_read(user_id, Utc::now())
            .await
            .map_err(DomainError::database)?;
        debug!(updated, "notifications marked read");
        Ok(updated)
    }
}
