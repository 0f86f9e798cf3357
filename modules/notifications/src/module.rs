use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::api::OpenApiRegistry;
use modkit::{
    DbModule, Module, ModuleCtx, RegistryBuilder, RestfulModule, Runnable, TokenVerifier,
    WithLifecycle,
};
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::NotificationsConfig;
use crate::contract::client::NotificationsApi;
use crate::domain::dispatcher::{DispatchPolicy, Dispatcher};
use crate::domain::service::Service;
use crate::gateways::local::NotificationsLocalClient;
use crate::infra::storage::{migrations::Migrator, SeaOrmNotificationsRepository};

pub const MODULE_NAME: &str = "notifications";

/// Feed REST API plus the outbox dispatcher, which runs as this module's
/// background task.
#[derive(Default)]
pub struct Notifications {
    service: ArcSwapOption<Service>,
    dispatcher: ArcSwapOption<Dispatcher>,
}

impl Notifications {
    pub fn dispatcher(&self) -> anyhow::Result<Arc<Dispatcher>> {
        self.dispatcher
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("notifications dispatcher not initialized"))
    }
}

#[async_trait]
impl Module for Notifications {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: NotificationsConfig = ctx.module_config()?;
        debug!(
            interval = ?cfg.dispatch_interval,
            batch_size = cfg.batch_size,
            max_attempts = cfg.max_attempts,
            "notifications configured"
        );

        let db = ctx.db_required()?;
        let repo = Arc::new(SeaOrmNotificationsRepository::new(db.sea()));
        let service = Arc::new(Service::new(repo.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            repo,
            DispatchPolicy {
                interval: cfg.dispatch_interval,
                batch_size: cfg.batch_size.max(1),
                max_attempts: cfg.max_attempts.max(1),
                retry_backoff: cfg.retry_backoff,
            },
        ));

        let api: Arc<dyn NotificationsApi> = Arc::new(NotificationsLocalClient::new(
            service.clone(),
            dispatcher.waker(),
        ));
        ctx.client_hub().register::<dyn NotificationsApi>(api);

        self.service.store(Some(service));
        self.dispatcher.store(Some(dispatcher));
        info!("notifications client published");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Notifications {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        Migrator::up(db.seaorm(), None).await?;
        debug!("notifications migrations applied");
        Ok(())
    }
}

impl RestfulModule for Notifications {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        let service = self
            .service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("notifications service not initialized"))?;
        let verifier = ctx.client_hub().get::<dyn TokenVerifier>()?;
        routes::register_routes(router, openapi, service, verifier)
    }
}

#[async_trait]
impl Runnable for Notifications {
    async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        self.dispatcher()?.run_until_cancelled(cancel).await;
        Ok(())
    }
}

/// Depends on `identity` for the token verifier.
pub fn register(builder: &mut RegistryBuilder) -> Arc<Notifications> {
    let module = Arc::new(Notifications::default());
    builder
        .module(MODULE_NAME, &["identity"], module.clone())
        .db(module.clone())
        .rest(module.clone())
        .stateful(Arc::new(WithLifecycle::from_arc(module.clone())));
    module
}
