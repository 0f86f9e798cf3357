use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use modkit::api::OpenApiRegistry;
use modkit::{
    DbModule, Module, ModuleCtx, RegistryBuilder, RestfulModule, Runnable, TokenVerifier,
    WithLifecycle,
};
use notifications::client::NotificationsApi;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::rest::handlers::PageLimits;
use crate::api::rest::routes;
use crate::config::AppointmentsConfig;
use crate::contract::client::AppointmentsApi;
use crate::domain::reminders::ReminderWorker;
use crate::domain::service::Service;
use crate::gateways::local::AppointmentsLocalClient;
use crate::infra::storage::{migrations::Migrator, SeaOrmAppointmentsRepository};

pub const MODULE_NAME: &str = "appointments";

/// Appointment REST API; the reminder worker runs as this module's
/// background task when enabled.
#[derive(Default)]
pub struct Appointments {
    config: ArcSwap<AppointmentsConfig>,
    service: ArcSwapOption<Service>,
    reminders: ArcSwapOption<ReminderWorker>,
}

impl Appointments {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("appointments service not initialized"))
    }
}

#[async_trait]
impl Module for Appointments {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: AppointmentsConfig = ctx.module_config()?;
        debug!(
            reminders = cfg.reminders_enabled,
            interval = ?cfg.reminder_interval,
            lead = ?cfg.reminder_lead,
            "appointments configured"
        );

        let db = ctx.db_required()?;
        let notifications = ctx.client_hub().get::<dyn NotificationsApi>()?;
        let service = Arc::new(Service::new(
            Arc::new(SeaOrmAppointmentsRepository::new(db.sea())),
            notifications,
        ));
        ctx.client_hub()
            .register::<dyn AppointmentsApi>(Arc::new(AppointmentsLocalClient::new(service.clone())));

        if cfg.reminders_enabled {
            self.reminders.store(Some(Arc::new(ReminderWorker::new(
                service.clone(),
                cfg.reminder_interval,
                cfg.reminder_lead,
            ))));
        }
        self.service.store(Some(service));
        self.config.store(Arc::new(cfg));
        info!("appointments client published");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Appointments {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        Migrator::up(db.seaorm(), None).await?;
        debug!("appointments migrations applied");
        Ok(())
    }
}

impl RestfulModule for Appointments {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        let cfg = self.config.load();
        let verifier = ctx.client_hub().get::<dyn TokenVerifier>()?;
        routes::register_routes(
            router,
            openapi,
            self.service()?,
            verifier,
            PageLimits {
                default: cfg.default_page_size.max(1),
                max: cfg.max_page_size.max(1),
            },
        )
    }
}

#[async_trait]
impl Runnable for Appointments {
    async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        match self.reminders.load_full() {
            Some(worker) => worker.run_until_cancelled(cancel).await,
            None => {
                debug!("appointment reminders disabled");
                cancel.cancelled().await;
            }
        }
        Ok(())
    }
}

/// Depends on `identity` for the token verifier and on `notifications` for
/// the outbox dispatcher.
pub fn register(builder: &mut RegistryBuilder) -> Arc<Appointments> {
    let module = Arc::new(Appointments::default());
    builder
        .module(MODULE_NAME, &["identity", "notifications"], module.clone())
        .db(module.clone())
        .rest(module.clone())
        .stateful(Arc::new(WithLifecycle::from_arc(module.clone())));
    module
}
