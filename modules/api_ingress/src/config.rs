use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `modules.api_ingress` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    /// Publish `/openapi.json`.
    pub enable_docs: bool,
    pub cors_enabled: bool,
    /// Handlers running longer than this answer 408.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            enable_docs: true,
            cors_enabled: true,
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
        }
    }
}
