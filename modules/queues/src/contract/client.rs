use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{error::QueuesError, model::QueueEntry};

/// In-process API of the queues module.
#[async_trait]
pub trait QueuesApi: Send + Sync {
    /// The patient's waiting or called entry, if any.
    async fn active_entry(&self, patient_id: Uuid) -> Result<Option<QueueEntry>, QueuesError>;
}
