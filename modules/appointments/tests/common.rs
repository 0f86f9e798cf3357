#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use appointments::domain::model::NewAppointment;
use appointments::domain::service::Service;
use appointments::infra::storage::{migrations::Migrator, SeaOrmAppointmentsRepository};
use appointments::model::{Gender, PatientInfo};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use modkit::api::{OpenApiRegistry, OperationSpec};
use modkit::security::{AuthError, SecurityCtx, TokenVerifier};
use modkit::Role;
use modkit_db::{ConnectOpts, DbHandle};
use notifications::client::NotificationsApi;
use notifications::error::NotificationsError;
use notifications::infra::storage::entity::outbox;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

pub async fn setup_db() -> DatabaseConnection {
    let handle = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
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

pub fn service(db: &DatabaseConnection, wakes: Arc<WakeCounter>) -> Arc<Service> {
    Arc::new(Service::new(
        Arc::new(SeaOrmAppointmentsRepository::new(db.clone())),
        wakes,
    ))
}

/// Staged outbox rows, oldest first.
pub async fn staged(db: &DatabaseConnection) -> Vec<outbox::Model> {
    outbox::Entity::find()
        .order_by_asc(outbox::Column::CreatedAt)
        .all(db)
        .await
        .unwrap()
}

pub fn booking(date: DateTime<Utc>) -> NewAppointment {
    NewAppointment {
        doctor: "Dr. Bello".into(),
        specialty: "Cardiology".into(),
        hospital_name: Some("General Hospital".into()),
        appointment_date: date,
        appointment_time: "10:30 AM".into(),
        notes: None,
        patient_info: PatientInfo {
            full_name: "Amara Okafor".into(),
            phone_number: "08012345678".into(),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        },
    }
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
