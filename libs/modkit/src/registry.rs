use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

type RestHostEntry = (&'static str, Arc<dyn contracts::RestHostModule>);

pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub db: Option<Arc<dyn contracts::DbModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// The final, topo-sorted runtime registry.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn contracts::Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
            tracing::debug!(module = e.name, "module initialized");
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &modkit_db::DbHandle) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(dbm) = &e.db {
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: e.name,
                        source,
                    })?;
                tracing::info!(module = e.name, "migrations applied");
            }
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let mut hosts = self
            .modules
            .iter()
            .filter_map(|e| e.rest_host.as_ref().map(|h| (e.name, h)));

        let Some((host_name, host)) = hosts.next() else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        if hosts.next().is_some() {
            return Err(RegistryError::MultipleRestHosts);
        }

        let host_ctx = base_ctx.clone().for_module(host_name);
        let registry: &dyn contracts::OpenApiRegistry = host.as_registry();

        // 1) host prepare: base router, global routes
        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_name,
                source,
            })?;

        // 2) every REST provider in dependency order
        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router, registry)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        // 3) host finalize: middleware stack, /openapi.json, keep the router for serving
        router = host
            .rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_name,
                source,
            })?;

        Ok(router)
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stops in reverse dependency order; failures are logged, not propagated.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
        Ok(())
    }
}

/// Collects modules and their capabilities; keys are module **names**.
#[derive(Default)]
pub struct RegistryBuilder {
    order: Vec<&'static str>,
    core: HashMap<&'static str, Arc<dyn contracts::Module>>,
    deps: HashMap<&'static str, &'static [&'static str]>,
    rest: HashMap<&'static str, Arc<dyn contracts::RestfulModule>>,
    rest_host: Option<RestHostEntry>,
    db: HashMap<&'static str, Arc<dyn contracts::DbModule>>,
    stateful: HashMap<&'static str, Arc<dyn contracts::StatefulModule>>,
    errors: Vec<String>,
}

/// Fluent capability registration for one module.
///
/// ```rust,ignore
/// builder
///     .module("queues", &["identity", "notifications"], queues.clone())
///     .db(queues.clone())
///     .rest(queues);
/// ```
pub struct ModuleRegistration<'a> {
    builder: &'a mut RegistryBuilder,
    name: &'static str,
}

impl ModuleRegistration<'_> {
    pub fn db(self, m: Arc<dyn contracts::DbModule>) -> Self {
        self.builder.register_db_with_meta(self.name, m);
        self
    }

    pub fn rest(self, m: Arc<dyn contracts::RestfulModule>) -> Self {
        self.builder.register_rest_with_meta(self.name, m);
        self
    }

    pub fn rest_host(self, m: Arc<dyn contracts::RestHostModule>) -> Self {
        self.builder.register_rest_host_with_meta(self.name, m);
        self
    }

    pub fn stateful(self, m: Arc<dyn contracts::StatefulModule>) -> Self {
        self.builder.register_stateful_with_meta(self.name, m);
        self
    }
}

impl RegistryBuilder {
    pub fn module(
        &mut self,
        name: &'static str,
        deps: &'static [&'static str],
        core: Arc<dyn contracts::Module>,
    ) -> ModuleRegistration<'_> {
        self.register_core_with_meta(name, deps, core);
        ModuleRegistration {
            builder: self,
            name,
        }
    }

    pub fn register_core_with_meta(
        &mut self,
        name: &'static str,
        deps: &'static [&'static str],
        m: Arc<dyn contracts::Module>,
    ) {
        if self.core.contains_key(name) {
            self.errors
                .push(format!("Module '{name}' is already registered"));
            return;
        }
        self.order.push(name);
        self.core.insert(name, m);
        self.deps.insert(name, deps);
    }

    pub fn register_rest_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::RestfulModule>,
    ) {
        self.rest.insert(name, m);
    }

    pub fn register_rest_host_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::RestHostModule>,
    ) {
        if let Some((existing, _)) = &self.rest_host {
            self.errors.push(format!(
                "Multiple REST host modules detected: '{existing}' and '{name}'. Only one REST host is allowed."
            ));
            return;
        }
        self.rest_host = Some((name, m));
    }

    pub fn register_db_with_meta(&mut self, name: &'static str, m: Arc<dyn contracts::DbModule>) {
        self.db.insert(name, m);
    }

    pub fn register_stateful_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::StatefulModule>,
    ) {
        self.stateful.insert(name, m);
    }

    /// DFS with path tracking; returns the cycle (first node repeated at the end).
    fn detect_cycle_with_path(
        names: &[&'static str],
        adj: &[Vec<usize>],
    ) -> Option<Vec<&'static str>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            node: usize,
            names: &[&'static str],
            adj: &[Vec<usize>],
            colors: &mut [Color],
            path: &mut Vec<usize>,
        ) -> Option<Vec<&'static str>> {
            colors[node] = Color::Gray;
            path.push(node);

            for &next in &adj[node] {
                match colors[next] {
                    Color::Gray => {
                        let start = path.iter().position(|&n| n == next)?;
                        let mut cycle: Vec<&'static str> =
                            path[start..].iter().map(|&i| names[i]).collect();
                        cycle.push(names[next]);
                        return Some(cycle);
                    }
                    Color::White => {
                        if let Some(cycle) = dfs(next, names, adj, colors, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Black => {}
                }
            }

            path.pop();
            colors[node] = Color::Black;
            None
        }

        let mut colors = vec![Color::White; names.len()];
        let mut path = Vec::new();
        (0..names.len()).find_map(|i| {
            if colors[i] == Color::White {
                dfs(i, names, adj, &mut colors, &mut path)
            } else {
                None
            }
        })
    }

    /// Validate capabilities and dependencies, then order modules so that every
    /// dependency comes first. Independent modules keep registration order.
    pub fn build_topo_sorted(self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        let capability_names = self
            .rest
            .keys()
            .chain(self.db.keys())
            .chain(self.stateful.keys())
            .chain(self.rest_host.iter().map(|(n, _)| n));
        for n in capability_names {
            if !self.core.contains_key(n) {
                return Err(RegistryError::UnknownModule((*n).to_string()));
            }
        }

        let names = &self.order;
        let idx: HashMap<&'static str, usize> =
            names.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        // edge dep -> module
        let mut adj = vec![Vec::<usize>::new(); names.len()];
        for (u, &n) in names.iter().enumerate() {
            let deps = self.deps.get(n).copied().unwrap_or(&[]);
            for &d in deps {
                let v = *idx.get(d).ok_or_else(|| RegistryError::UnknownDependency {
                    module: n.to_string(),
                    depends_on: d.to_string(),
                })?;
                adj[v].push(u);
            }
        }

        if let Some(path) = Self::detect_cycle_with_path(names, &adj) {
            return Err(RegistryError::CycleDetected { path });
        }

        // Kahn's algorithm
        let mut indeg = vec![0usize; names.len()];
        for targets in &adj {
            for &t in targets {
                indeg[t] += 1;
            }
        }
        let mut q: VecDeque<usize> = (0..names.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(names.len());
        while let Some(u) = q.pop_front() {
            order.push(u);
            for &w in &adj[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    q.push_back(w);
                }
            }
        }

        let mut entries = Vec::with_capacity(order.len());
        for i in order {
            let name = names[i];
            let core = self
                .core
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::CoreNotFound(name.to_string()))?;
            entries.push(ModuleEntry {
                name,
                deps: self.deps.get(name).copied().unwrap_or(&[]),
                core,
                rest: self.rest.get(name).cloned(),
                rest_host: self
                    .rest_host
                    .as_ref()
                    .filter(|(host_name, _)| *host_name == name)
                    .map(|(_, module)| module.clone()),
                db: self.db.get(name).cloned(),
                stateful: self.stateful.get(name).cloned(),
            });
        }

        tracing::info!(
            modules = ?entries.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module dependency order resolved (topo)"
        );

        Ok(ModuleRegistry { modules: entries })
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no 'rest_host'")]
    RestRequiresHost,
    #[error("multiple 'rest_host' modules detected; exactly one is allowed")]
    MultipleRestHosts,

    #[error("unknown module '{0}'")]
    UnknownModule(String),
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("core not found for '{0}'")]
    CoreNotFound(String),
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OpenApiRegistry;
    use crate::context::{ModuleCtx, ModuleCtxBuilder};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct DummyCore;
    #[async_trait::async_trait]
    impl contracts::Module for DummyCore {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Default)]
    struct DummyRegistry;
    impl OpenApiRegistry for DummyRegistry {
        fn register_operation(&self, _spec: &crate::api::OperationSpec) {}
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

    /// Records the order of host/provider calls.
    #[derive(Default)]
    struct RecordingHost {
        reg: DummyRegistry,
        calls: Mutex<Vec<&'static str>>,
    }
    impl contracts::RestHostModule for RecordingHost {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.calls.lock().push("prepare");
            Ok(router)
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.calls.lock().push("finalize");
            Ok(router)
        }
        fn as_registry(&self) -> &dyn OpenApiRegistry {
            &self.reg
        }
    }

    #[derive(Default)]
    struct DummyRest;
    impl contracts::RestfulModule for DummyRest {
        fn register_rest(
            &self,
            ctx: &ModuleCtx,
            router: Router,
            _registry: &dyn OpenApiRegistry,
        ) -> anyhow::Result<Router> {
            assert_eq!(ctx.current_module(), Some("svc"));
            Ok(router.route("/dummy", axum::routing::get(|| async { "ok" })))
        }
    }

    fn base_ctx() -> ModuleCtx {
        ModuleCtxBuilder::new(CancellationToken::new()).build()
    }

    #[test]
    fn topo_sort_puts_dependencies_first() {
        let mut b = ModuleRegistry::builder();
        b.module("queues", &["identity", "notifications"], Arc::new(DummyCore));
        b.module("notifications", &[], Arc::new(DummyCore));
        b.module("identity", &[], Arc::new(DummyCore));
        b.module("api_ingress", &[], Arc::new(DummyCore));

        let reg = b.build_topo_sorted().unwrap();
        let order: Vec<_> = reg.modules().iter().map(|m| m.name).collect();
        assert_eq!(order, vec!["notifications", "identity", "api_ingress", "queues"]);
        assert!(reg.get_module("identity").is_some());
    }

    #[test]
    fn unknown_dependency_error() {
        let mut b = RegistryBuilder::default();
        b.module("appointments", &["billing"], Arc::new(DummyCore));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::UnknownDependency { module, depends_on } => {
                assert_eq!(module, "appointments");
                assert_eq!(depends_on, "billing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let mut b = RegistryBuilder::default();
        b.module("a", &["b"], Arc::new(DummyCore));
        b.module("b", &["c"], Arc::new(DummyCore));
        b.module("c", &["a"], Arc::new(DummyCore));
        b.module("d", &[], Arc::new(DummyCore));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::CycleDetected { path } => {
                assert!(path.contains(&"a") && path.contains(&"b") && path.contains(&"c"));
                assert!(!path.contains(&"d"));
                assert_eq!(path.first(), path.last());
                let msg = RegistryError::CycleDetected { path }.to_string();
                assert!(msg.contains("->"));
            }
            other => panic!("expected CycleDetected, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_module_is_a_configuration_error() {
        let mut b = RegistryBuilder::default();
        b.module("a", &[], Arc::new(DummyCore));
        b.module("a", &[], Arc::new(DummyCore));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::InvalidRegistryConfiguration { errors } => {
                assert!(errors.iter().any(|e| e.contains("already registered")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn capability_without_core_is_rejected() {
        let mut b = RegistryBuilder::default();
        b.register_rest_with_meta("ghost", Arc::new(DummyRest));
        assert!(matches!(
            b.build_topo_sorted().unwrap_err(),
            RegistryError::UnknownModule(name) if name == "ghost"
        ));
    }

    #[test]
    fn rest_requires_host_if_rest_modules_exist() {
        let mut b = RegistryBuilder::default();
        b.module("svc", &[], Arc::new(DummyCore))
            .rest(Arc::new(DummyRest));
        let reg = b.build_topo_sorted().unwrap();

        let err = reg.run_rest_phase(&base_ctx(), Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[test]
    fn second_rest_host_is_rejected() {
        let mut b = RegistryBuilder::default();
        b.module("h1", &[], Arc::new(DummyCore))
            .rest_host(Arc::new(RecordingHost::default()));
        b.module("h2", &[], Arc::new(DummyCore))
            .rest_host(Arc::new(RecordingHost::default()));
        assert!(matches!(
            b.build_topo_sorted().unwrap_err(),
            RegistryError::InvalidRegistryConfiguration { .. }
        ));
    }

    #[test]
    fn host_prepares_and_finalizes_around_providers() {
        let host = Arc::new(RecordingHost::default());
        let mut b = RegistryBuilder::default();
        b.module("host", &[], Arc::new(DummyCore))
            .rest_host(host.clone());
        b.module("svc", &["host"], Arc::new(DummyCore))
            .rest(Arc::new(DummyRest));

        let reg = b.build_topo_sorted().unwrap();
        let _router = reg.run_rest_phase(&base_ctx(), Router::new()).unwrap();
        assert_eq!(*host.calls.lock(), vec!["prepare", "finalize"]);
    }

    #[tokio::test]
    async fn phases_run_with_plain_modules() {
        let mut b = RegistryBuilder::default();
        b.module("a", &[], Arc::new(DummyCore));
        b.module("b", &["a"], Arc::new(DummyCore));
        let reg = b.build_topo_sorted().unwrap();

        reg.run_init_phase(&base_ctx()).await.unwrap();
        let cancel = CancellationToken::new();
        reg.run_start_phase(cancel.child_token()).await.unwrap();
        reg.run_stop_phase(cancel.child_token()).await.unwrap();
    }
}
