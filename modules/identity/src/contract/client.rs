use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{error::IdentityError, model::UserProfile};

/// In-process API of the identity module.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<UserProfile, IdentityError>;

    /// Profiles for the ids that exist; unknown ids are skipped.
    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, IdentityError>;
}
