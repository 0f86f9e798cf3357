#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use identity::domain::ports::MailerPort;
use identity::domain::service::{Service, ServiceConfig};
use identity::infra::jwt::JwtCodec;
use identity::infra::storage::{migrations::Migrator, SeaOrmUsersRepository};
use modkit::api::{OpenApiRegistry, OperationSpec};
use modkit_db::{ConnectOpts, DbHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

pub const SECRET: &[u8] = b"identity-test-secret";

pub async fn setup_db() -> DatabaseConnection {
    // One pooled connection, so every query sees the same in-memory database.
    let handle = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();
    let db = handle.sea();
    Migrator::up(&db, None).await.unwrap();
    db
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Welcome { to: String },
    Reset { to: String, link: String },
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Sent>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find_map(|m| match m {
            Sent::Reset { link, .. } => link.split("token=").nth(1).map(str::to_string),
            _ => None,
        })
    }
}

#[async_trait]
impl MailerPort for RecordingMailer {
    async fn send_welcome(&self, to: &str, _first_name: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Welcome { to: to.into() });
        if self.fail {
            anyhow::bail!("smtp down");
        }
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Sent::Reset {
            to: to.into(),
            link: reset_link.into(),
        });
        if self.fail {
            anyhow::bail!("smtp down");
        }
        Ok(())
    }
}

pub fn codec() -> Arc<JwtCodec> {
    Arc::new(JwtCodec::new(SECRET, Duration::from_secs(3600)))
}

pub fn service(db: &DatabaseConnection, mailer: Arc<RecordingMailer>) -> Arc<Service> {
    service_with_iterations(db, mailer, 1_000)
}

pub fn service_with_iterations(
    db: &DatabaseConnection,
    mailer: Arc<RecordingMailer>,
    password_iterations: u32,
) -> Arc<Service> {
    Arc::new(Service::new(
        Arc::new(SeaOrmUsersRepository::new(db.clone())),
        mailer,
        codec(),
        ServiceConfig {
            password_iterations,
            ..Default::default()
        },
    ))
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
