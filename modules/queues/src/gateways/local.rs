use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{client::QueuesApi, error::QueuesError, model::QueueEntry};
use crate::domain::service::Service;

pub struct QueuesLocalClient {
    service: Arc<Service>,
}

impl QueuesLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl QueuesApi for QueuesLocalClient {
    async fn active_entry(&self, patient_id: Uuid) -> Result<Option<QueueEntry>, QueuesError> {
        self.service
            .active_entry(patient_id)
            .await
            .map_err(Into::into)
    }
}
