//! Process-level plumbing shared by the Qure binaries: layered configuration,
//! home directory resolution and logging bootstrap.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section,
    ServerConfig,
};

use std::collections::HashMap;

/// Read-only access to the raw per-module configuration sections.
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// `ConfigProvider` backed by a loaded [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppConfigProvider {
    modules: HashMap<String, serde_json::Value>,
}

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self {
            modules: config.modules,
        }
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.modules.get(module_name)
    }
}
