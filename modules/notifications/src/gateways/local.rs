use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::contract::{client::NotificationsApi, error::NotificationsError};
use crate::domain::service::Service;

pub struct NotificationsLocalClient {
    service: Arc<Service>,
    wake: Arc<Notify>,
}

impl NotificationsLocalClient {
    pub fn new(service: Arc<Service>, wake: Arc<Notify>) -> Self {
        Self { service, wake }
    }
}

#[async_trait]
impl NotificationsApi for NotificationsLocalClient {
    async fn unread_count(&self, user_id: Uuid) -> Result<u64, NotificationsError> {
        self.service.unread_count(user_id).await.map_err(Into::into)
    }

    fn wake_dispatcher(&self) {
        self.wake.notify_one();
    }
}
