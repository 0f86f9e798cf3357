use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client_hub::ClientHub;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// Per-phase view handed to every module: shared DB, config, client hub and
/// the process-wide cancellation token.
#[derive(Clone)]
pub struct ModuleCtx {
    pub(crate) db: Option<Arc<modkit_db::DbHandle>>,
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) client_hub: Arc<ClientHub>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                client_hub: Arc::new(ClientHub::default()),
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: Arc<modkit_db::DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn with_client_hub(mut self, hub: Arc<ClientHub>) -> Self {
        self.inner.client_hub = hub;
        self
    }

    /// Scope the context to one module; tests use it to feed `module_config`.
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.inner.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    /// Scope context to a specific module name (used by the registry).
    pub(crate) fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn db(&self) -> Option<Arc<modkit_db::DbHandle>> {
        self.db.clone()
    }

    /// The shared database or an error naming the module that needed it.
    pub fn db_required(&self) -> anyhow::Result<Arc<modkit_db::DbHandle>> {
        self.db.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "module '{}' requires a database, but none is configured",
                self.current_module().unwrap_or("?")
            )
        })
    }

    pub fn client_hub(&self) -> Arc<ClientHub> {
        self.client_hub.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Deserialize the module's section into `T`; a missing section yields
    /// `T::default()`, a malformed one is an error.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        let (Some(name), Some(p)) = (&self.module_name, &self.config_provider) else {
            return Ok(T::default());
        };
        match p.get_module_config(name) {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(v) => serde_json::from_value::<T>(v.clone())
                .map_err(|e| anyhow::anyhow!("invalid '{name}' module config: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    struct MapProvider(HashMap<String, serde_json::Value>);

    impl ConfigProvider for MapProvider {
        fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
            self.0.get(module_name)
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields, default)]
    struct SampleConfig {
        page_size: u32,
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self { page_size: 10 }
        }
    }

    fn ctx_with(section: Option<serde_json::Value>) -> ModuleCtx {
        let mut map = HashMap::new();
        if let Some(v) = section {
            map.insert("sample".to_string(), v);
        }
        ModuleCtxBuilder::new(CancellationToken::new())
            .with_config_provider(Arc::new(MapProvider(map)))
            .build()
            .for_module("sample")
    }

    #[test]
    fn missing_section_falls_back_to_default() {
        let cfg: SampleConfig = ctx_with(None).module_config().unwrap();
        assert_eq!(cfg, SampleConfig::default());
    }

    #[test]
    fn present_section_is_deserialized() {
        let cfg: SampleConfig = ctx_with(Some(serde_json::json!({"page_size": 25})))
            .module_config()
            .unwrap();
        assert_eq!(cfg.page_size, 25);
    }

    #[test]
    fn malformed_section_is_an_error() {
        let err = ctx_with(Some(serde_json::json!({"page_sise": 25})))
            .module_config::<SampleConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("sample"));
    }

    #[test]
    fn db_required_names_the_module() {
        let err = ctx_with(None).db_required().unwrap_err();
        assert!(err.to_string().contains("'sample'"));
    }
}
