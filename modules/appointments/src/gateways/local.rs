use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{client::AppointmentsApi, error::AppointmentsError, model::Appointment};
use crate::domain::service::Service;

pub struct AppointmentsLocalClient {
    service: Arc<Service>,
}

impl AppointmentsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AppointmentsApi for AppointmentsLocalClient {
    async fn get_appointment(&self, id: Uuid) -> Result<Appointment, AppointmentsError> {
        self.service.get_any(id).await.map_err(Into::into)
    }
}
