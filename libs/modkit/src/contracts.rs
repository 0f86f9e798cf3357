//! Capabilities a module can register with the [`crate::RegistryBuilder`].
//! Every module has a [`Module`]; the rest are opt-in per phase.

use async_trait::async_trait;
use axum::Router;
use modkit_db::DbHandle;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;
pub use crate::api::OpenApiRegistry;

/// Init phase: read config, build services, publish clients to the hub.
/// Tables may not exist yet.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Migration phase, in dependency order, against the shared database.
#[async_trait]
pub trait DbModule: Send + Sync {
    async fn migrate(&self, db: &DbHandle) -> anyhow::Result<()>;
}

/// REST phase: mount routes and describe them in the OpenAPI registry.
pub trait RestfulModule: Send + Sync {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router>;
}

/// Owner of the HTTP listener. `rest_prepare` runs before every
/// [`RestfulModule`] and `rest_finalize` after them; serving starts later in
/// the host's [`StatefulModule::start`].
pub trait RestHostModule: Send + Sync + 'static {
    fn rest_prepare(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;
    fn rest_finalize(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;
    fn as_registry(&self) -> &dyn OpenApiRegistry;
}

/// Listeners and background workers. `start` must return once the work is
/// spawned; `stop` waits for it to wind down.
#[async_trait]
pub trait StatefulModule: Send + Sync {
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn stop(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}
