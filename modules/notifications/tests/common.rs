#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use modkit::api::{OpenApiRegistry, OperationSpec};
use modkit::security::{AuthError, SecurityCtx, TokenVerifier};
use modkit::Role;
use modkit_db::{ConnectOpts, DbHandle};
use notifications::domain::dispatcher::{DispatchPolicy, Dispatcher};
use notifications::infra::storage::{migrations::Migrator, SeaOrmNotificationsRepository};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

pub async fn setup_db() -> DatabaseConnection {
    let handle = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();
    let db = handle.sea();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn policy() -> DispatchPolicy {
    DispatchPolicy {
        interval: Duration::from_millis(20),
        batch_size: 50,
        max_attempts: 3,
        retry_backoff: Duration::ZERO,
    }
}

pub fn dispatcher(db: &DatabaseConnection, policy: DispatchPolicy) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        Arc::new(SeaOrmNotificationsRepository::new(db.clone())),
        policy,
    ))
}

/// Accepts tokens of the form `user:<uuid>`.
pub struct UuidTokens;

impl TokenVerifier for UuidTokens {
    fn verify(&self, token: &str) -> Result<SecurityCtx, AuthError> {
        let id = token
            .strip_prefix("user:")
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(AuthError::InvalidToken)?;
        Ok(SecurityCtx {
            user_id: id,
            role: Role::Patient,
            name: "Test".into(),
        })
    }
}

pub struct NoopRegistry;

impl OpenApiRegistry for NoopRegistry {
    fn register_operation(&self, _spec: &OperationSpec) {}

    fn ensure_schema_raw(
        &self,
        name: &str,
        _schemas: Vec<(
            String,
            utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
        )>,
    ) -> String {
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
