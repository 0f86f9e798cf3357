//! Drives a [`ModuleRegistry`] through its phases:
//! init → db → rest → start → wait → stop.
//!
//! One `ModuleCtx` is built up front and shared by every phase. Shutdown is
//! triggered by OS signals, an external `CancellationToken` or any future.

use crate::context::{ConfigProvider, ModuleCtxBuilder};
use crate::registry::ModuleRegistry;
use crate::runtime::shutdown;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// How modules get their database.
pub enum DbOptions {
    /// `ModuleCtx::db()` is `None`; `db_required()` errors.
    None,
    /// A connected handle shared by every module; migrations run in the db phase.
    Handle(Arc<modkit_db::DbHandle>),
}

/// When the runtime should stop.
pub enum ShutdownOptions {
    /// Ctrl+C / SIGTERM.
    Signals,
    /// The caller cancels this token.
    Token(CancellationToken),
    /// Shutdown begins once the future completes.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    pub registry: ModuleRegistry,
    /// Raw module config sections by module name.
    pub modules_cfg: Arc<dyn ConfigProvider>,
    pub db: DbOptions,
    pub shutdown: ShutdownOptions,
}

pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let RunOptions {
        registry,
        modules_cfg,
        db,
        shutdown,
    } = opts;

    let cancel = match &shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(()) => tracing::info!("shutdown: signal received"),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: signal listener failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let mut ctx_builder = ModuleCtxBuilder::new(cancel.clone())
        .with_client_hub(Arc::new(crate::client_hub::ClientHub::default()))
        .with_config_provider(modules_cfg);
    if let DbOptions::Handle(handle) = &db {
        ctx_builder = ctx_builder.with_db(handle.clone());
    }
    let base_ctx = ctx_builder.build();

    tracing::info!("Phase: init");
    registry.run_init_phase(&base_ctx).await?;

    if let DbOptions::Handle(handle) = &db {
        tracing::info!("Phase: db");
        registry.run_db_phase(handle).await?;
    }

    tracing::info!("Phase: rest (sync)");
    let _ = registry.run_rest_phase(&base_ctx, axum::Router::new())?;

    tracing::info!("Phase: start");
    registry.run_start_phase(cancel.clone()).await?;

    cancel.cancelled().await;

    tracing::info!("Phase: stop");
    registry.run_stop_phase(cancel).await?;

    if let DbOptions::Handle(handle) = &db {
        handle.close().await;
    }
    Ok(())
}
