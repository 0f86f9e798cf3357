use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{client::IdentityApi, error::IdentityError, model::UserProfile};
use crate::domain::service::Service;

/// In-process [`IdentityApi`] backed by the domain service.
pub struct IdentityLocalClient {
    service: Arc<Service>,
}

impl IdentityLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl IdentityApi for IdentityLocalClient {
    async fn get_profile(&self, id: Uuid) -> Result<UserProfile, IdentityError> {
        self.service.get_profile(id).await.map_err(Into::into)
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, IdentityError> {
        self.service.get_profiles(ids).await.map_err(Into::into)
    }
}
