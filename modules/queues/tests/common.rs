#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use identity::client::IdentityApi;
use identity::error::IdentityError;
use identity::model::UserProfile;
use modkit::api::{OpenApiRegistry, OperationSpec};
use modkit::security::{AuthError, SecurityCtx, TokenVerifier};
use modkit::Role;
use modkit_db::{ConnectOpts, DbHandle};
use notifications::client::NotificationsApi;
use notifications::error::NotificationsError;
use notifications::infra::storage::entity::outbox;
use queues::domain::service::{JoinRequest, Service};
use queues::infra::storage::{migrations::Migrator, SeaOrmQueuesRepository};
use queues::model::QueuePriority;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

pub const HOSPITAL: &str = "General Hospital";

pub async fn setup_db() -> DatabaseConnection {
    migrated("sqlite::memory:").await
}

/// File database behind a full connection pool, for tests that need real
/// concurrent writers.
pub async fn setup_file_db(dir: &tempfile::TempDir) -> DatabaseConnection {
    let dsn = format!(
        "sqlite://{}?busy_timeout=5000",
        dir.path().join("queues.db").display()
    );
    migrated(&dsn).await
}

async fn migrated(dsn: &str) -> DatabaseConnection {
    let handle = DbHandle::connect(dsn, ConnectOpts::default())
        .await
        .unwrap();
    let db = handle.sea();
    notifications::infra::storage::migrations::Migrator::up(&db, None)
        .await
        .unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Counts dispatcher wake-ups instead of delivering.
#[derive(Default)]
pub struct WakeCounter(AtomicUsize);

impl WakeCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationsApi for WakeCounter {
    async fn unread_count(&self, _user_id: Uuid) -> Result<u64, NotificationsError> {
        Ok(0)
    }

    fn wake_dispatcher(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fixed set of patient profiles.
#[derive(Default)]
pub struct Profiles(pub Vec<UserProfile>);

impl Profiles {
    pub fn with(ids: &[(Uuid, &str, &str)]) -> Self {
        Self(
            ids.iter()
                .map(|(id, first, last)| profile(*id, first, last))
                .collect(),
        )
    }
}

#[async_trait]
impl IdentityApi for Profiles {
    async fn get_profile(&self, id: Uuid) -> Result<UserProfile, IdentityError> {
        self.0
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(IdentityError::NotFound { id })
    }

    async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, IdentityError> {
        Ok(self
            .0
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

pub fn profile(id: Uuid, first: &str, last: &str) -> UserProfile {
    UserProfile {
        id,
        first_name: first.into(),
        last_name: last.into(),
        email: format!("{}@example.com", first.to_lowercase()),
        phone: "08012345678".into(),
        role: Role::Patient,
        hospital_name: None,
        created_at: Utc::now(),
    }
}

pub fn service(
    db: &DatabaseConnection,
    profiles: Profiles,
    wakes: Arc<WakeCounter>,
) -> Arc<Service> {
    Arc::new(Service::new(
        Arc::new(SeaOrmQueuesRepository::new(db.clone())),
        Arc::new(profiles),
        wakes,
        15,
    ))
}

pub fn join_req(specialty: &str) -> JoinRequest {
    JoinRequest {
        hospital_name: HOSPITAL.into(),
        specialty: specialty.into(),
        notes: None,
        priority: QueuePriority::Normal,
    }
}

/// Staged outbox rows, oldest first.
pub async fn staged(db: &DatabaseConnection) -> Vec<outbox::Model> {
    outbox::Entity::find()
        .order_by_asc(outbox::Column::CreatedAt)
        .all(db)
        .await
        .unwrap()
}

/// Tokens look like `patient:<uuid>` or `staff:<uuid>`.
pub struct RoleTokens;

impl TokenVerifier for RoleTokens {
    fn verify(&self, token: &str) -> Result<SecurityCtx, AuthError> {
        let (role, id) = token.split_once(':').ok_or(AuthError::InvalidToken)?;
        let role: Role = role.parse().map_err(|_| AuthError::InvalidToken)?;
        let user_id = Uuid::parse_str(id).map_err(|_| AuthError::InvalidToken)?;
        Ok(SecurityCtx {
            user_id,
            role,
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
