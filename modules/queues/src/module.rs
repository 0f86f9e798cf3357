use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use identity::client::IdentityApi;
use modkit::api::OpenApiRegistry;
use modkit::{DbModule, Module, ModuleCtx, RegistryBuilder, RestfulModule, TokenVerifier};
use notifications::client::NotificationsApi;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::handlers::PageLimits;
use crate::api::rest::routes;
use crate::config::QueuesConfig;
use crate::contract::client::QueuesApi;
use crate::domain::service::Service;
use crate::gateways::local::QueuesLocalClient;
use crate::infra::storage::{migrations::Migrator, SeaOrmQueuesRepository};

pub const MODULE_NAME: &str = "queues";

#[derive(Default)]
pub struct Queues {
    config: ArcSwap<QueuesConfig>,
    service: ArcSwapOption<Service>,
}

impl Queues {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("queues service not initialized"))
    }
}

#[async_trait]
impl Module for Queues {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: QueuesConfig = ctx.module_config()?;
        debug!(
            minutes_per_patient = cfg.minutes_per_patient,
            debug_endpoint = cfg.enable_debug_endpoint,
            "queues configured"
        );
        if cfg.enable_debug_endpoint {
            warn!("queue debug endpoint is enabled; it exposes every entry");
        }

        let db = ctx.db_required()?;
        let hub = ctx.client_hub();
        let service = Arc::new(Service::new(
            Arc::new(SeaOrmQueuesRepository::new(db.sea())),
            hub.get::<dyn IdentityApi>()?,
            hub.get::<dyn NotificationsApi>()?,
            cfg.minutes_per_patient,
        ));
        hub.register::<dyn QueuesApi>(Arc::new(QueuesLocalClient::new(service.clone())));

        self.service.store(Some(service));
        self.config.store(Arc::new(cfg));
        info!("queues client published");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Queues {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        Migrator::up(db.seaorm(), None).await?;
        debug!("queues migrations applied");
        Ok(())
    }
}

impl RestfulModule for Queues {
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
            cfg.enable_debug_endpoint,
        )
    }
}

/// Depends on `identity` for patient profiles and the token verifier, and on
/// `notifications` for the outbox dispatcher.
pub fn register(builder: &mut RegistryBuilder) -> Arc<Queues> {
    let module = Arc::new(Queues::default());
    builder
        .module(MODULE_NAME, &["identity", "notifications"], module.clone())
        .db(module.clone())
        .rest(module.clone());
    module
}
