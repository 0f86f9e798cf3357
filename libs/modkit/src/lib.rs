//! # ModKit
//!
//! Building blocks for a modular server: module contracts, an explicit registry
//! ordered by dependencies, a phase runner (init → db → rest → start → stop),
//! and the shared HTTP API toolkit.
//!
//! ```rust,ignore
//! let mut builder = ModuleRegistry::builder();
//! identity::register(&mut builder);
//! queues::register(&mut builder);
//! let registry = builder.build_topo_sorted()?;
//! modkit::run(RunOptions { registry, .. }).await?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod client_hub;
pub mod context;
pub mod contracts;
pub mod lifecycle;
pub mod registry;
pub mod runtime;
pub mod security;

pub use api::{
    ApiResponse, FieldError, OpenApiRegistry, OperationBuilder, PageRequest, Pagination, Problem,
    ProblemResponse, ValidatedJson, ValidatedQuery,
};
pub use client_hub::{ClientHub, ClientHubError};
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::*;
pub use lifecycle::{Lifecycle, ReadySignal, Runnable, Status, StopReason, WithLifecycle};
pub use registry::{ModuleRegistry, RegistryBuilder, RegistryError};
pub use runtime::{run, DbOptions, RunOptions, ShutdownOptions};
pub use security::{Role, RouterSecurityExt, SecurityCtx, TokenVerifier};
