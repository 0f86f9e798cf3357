use anyhow::anyhow;
use sea_orm::Set;

use crate::domain::model::User;
use crate::infra::storage::entity::{ActiveModel, Model};

impl TryFrom<Model> for User {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let role = m
            .role
            .parse()
            .map_err(|e: String| anyhow!("user {}: {e}", m.id))?;
        Ok(User {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: m.email,
            phone: m.phone,
            password_hash: m.password_hash,
            role,
            hospital_name: m.hospital_name,
            reset_token_hash: m.reset_token_hash,
            reset_token_expires_at: m.reset_token_expires_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<User> for ActiveModel {
    fn from(u: User) -> Self {
        ActiveModel {
            id: Set(u.id),
            first_name: Set(u.first_name),
            last_name: Set(u.last_name),
            email: Set(u.email),
            phone: Set(u.phone),
            password_hash: Set(u.password_hash),
            role: Set(u.role.as_str().to_string()),
            hospital_name: Set(u.hospital_name),
            reset_token_hash: Set(u.reset_token_hash),
            reset_token_expires_at: Set(u.reset_token_expires_at),
            created_at: Set(u.created_at),
            updated_at: Set(u.updated_at),
        }
    }
}
