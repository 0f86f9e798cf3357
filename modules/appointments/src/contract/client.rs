use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{error::AppointmentsError, model::Appointment};

/// In-process API of the appointments module.
#[async_trait]
pub trait AppointmentsApi: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentsError>;
}
