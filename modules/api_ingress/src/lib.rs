//! HTTP host module: owns the listener, the global middleware stack and the
//! OpenAPI document assembled from every module's operations.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::http::{Method, StatusCode};
use axum::{middleware::from_fn, routing::get, Router};
use dashmap::DashMap;
use modkit::api::{problem_context_middleware, OpenApiRegistry, OperationSpec};
use modkit::lifecycle::{Lifecycle, ReadySignal};
use modkit::{ModuleCtx, RegistryBuilder};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{schema::Schema, RefOr};

mod config;
pub mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;
use openapi::ComponentsMap;

pub const MODULE_NAME: &str = "api_ingress";

const STOP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    // Copy-on-write; writes happen only during the REST phase.
    components: ArcSwap<ComponentsMap>,
    final_router: Mutex<Option<Router>>,

    registered_routes: DashMap<(Method, String), ()>,
    registered_handlers: DashMap<String, ()>,
    operation_specs: DashMap<String, OperationSpec>,

    lifecycle: Lifecycle,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components: ArcSwap::from_pointee(ComponentsMap::new()),
            final_router: Mutex::new(None),
            registered_routes: DashMap::new(),
            registered_handlers: DashMap::new(),
            operation_specs: DashMap::new(),
            lifecycle: Lifecycle::new(),
            local_addr: Mutex::new(None),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Address the listener is bound to; `None` until started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn status(&self) -> modkit::Status {
        self.lifecycle.status()
    }

    pub fn operation_count(&self) -> usize {
        self.operation_specs.len()
    }

    pub fn build_openapi(&self) -> Result<openapi::OpenApi> {
        let components = self.components.load();
        let specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|e| e.value().clone())
            .collect();
        tracing::info!(operations = specs.len(), "building OpenAPI document");
        openapi::build_document(&specs, &components)
    }

    /// Global middleware, innermost first: body limit, CORS, timeout, problem
    /// context, request id extension, trace span, request id propagation and
    /// generation.
    fn apply_middleware(&self, mut router: Router) -> Router {
        let cfg = self.get_config();
        let x_request_id = request_id::header();

        router = router.layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes));
        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                cfg.request_timeout,
            ))
            .layer(from_fn(problem_context_middleware))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Router after the REST phase, with the host routes and middleware.
    pub fn final_router(&self) -> Option<Router> {
        self.final_router.lock().clone()
    }

    async fn serve(
        listener: TcpListener,
        router: Router,
        cancel: CancellationToken,
        ready: ReadySignal,
    ) -> Result<()> {
        ready.notify();

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &ModuleCtx) -> Result<()> {
        let cfg: ApiIngressConfig = ctx.module_config()?;
        tracing::debug!(
            bind_addr = %cfg.bind_addr,
            docs = cfg.enable_docs,
            "api_ingress configured"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> Result<Router> {
        tracing::debug!("REST host prepared base router with health check");
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &ModuleCtx, mut router: Router) -> Result<Router> {
        if self.get_config().enable_docs {
            let document = Arc::new(serde_json::to_value(self.build_openapi()?)?);
            router = router.route(
                "/openapi.json",
                get(move || {
                    let document = document.clone();
                    async move { axum::Json((*document).clone()) }
                }),
            );
        }

        let router = self.apply_middleware(
            router
                .fallback(web::route_not_found)
                .method_not_allowed_fallback(web::method_not_allowed),
        );
        *self.final_router.lock() = Some(router.clone());

        tracing::debug!(
            operations = self.operation_specs.len(),
            "REST host finalized router"
        );
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

#[async_trait]
impl modkit::StatefulModule for ApiIngress {
    /// Binds before returning so a busy port fails the start phase.
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", cfg.bind_addr))?;
        let router = self
            .final_router()
            .ok_or_else(|| anyhow::anyhow!("REST phase did not run; nothing to serve"))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let bound = listener.local_addr()?;
        *self.local_addr.lock() = Some(bound);
        tracing::info!(addr = %bound, "HTTP server bound");

        self.lifecycle
            .start_with_ready_and_token(cancel.child_token(), move |cancel, ready| {
                Self::serve(listener, router, cancel, ready)
            })?;
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> Result<()> {
        let reason = self.lifecycle.stop(STOP_TIMEOUT).await?;
        tracing::info!(?reason, "HTTP server stopped");
        Ok(())
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) {
        // First registration wins; a second one is a wiring mistake.
        if self
            .registered_handlers
            .insert(spec.handler_id.clone(), ())
            .is_some()
        {
            tracing::error!(
                handler_id = %spec.handler_id,
                method = %spec.method,
                path = %spec.path,
                "duplicate handler_id; ignoring subsequent registration"
            );
            return;
        }
        let route_key = (spec.method.clone(), spec.path.clone());
        if self.registered_routes.insert(route_key, ()).is_some() {
            tracing::error!(
                method = %spec.method,
                path = %spec.path,
                "duplicate (method, path); ignoring subsequent registration"
            );
            return;
        }

        let key = format!("{}:{}", spec.method, spec.path);
        self.operation_specs.insert(key, spec.clone());
        tracing::debug!(
            handler_id = %spec.handler_id,
            method = %spec.method,
            path = %spec.path,
            total = self.operation_specs.len(),
            "registered API operation"
        );
    }

    fn ensure_schema_raw(&self, name: &str, schemas: Vec<(String, RefOr<Schema>)>) -> String {
        let current = self.components.load();
        let fresh: Vec<_> = schemas
            .into_iter()
            .filter(|(key, _)| !current.contains_key(key))
            .collect();
        if fresh.is_empty() {
            return name.to_string();
        }

        let mut next = (**current).clone();
        for (key, schema) in fresh {
            tracing::debug!(schema = %key, "registered component schema");
            next.insert(key, schema);
        }
        self.components.store(Arc::new(next));
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Adds the ingress as core module, REST host and stateful server.
pub fn register(builder: &mut RegistryBuilder) -> Arc<ApiIngress> {
    let ingress = Arc::new(ApiIngress::default());
    builder
        .module(MODULE_NAME, &[], ingress.clone())
        .rest_host(ingress.clone())
        .stateful(ingress.clone());
    ingress
}
