use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `modules.identity` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IdentityConfig {
    /// HS256 signing secret; a random per-process secret is used when empty.
    pub jwt_secret: String,
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub reset_token_ttl: Duration,
    /// Base of the links put into emails.
    pub frontend_url: String,
    /// JSON relay endpoint; mail is only logged when absent.
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub password_iterations: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            reset_token_ttl: Duration::from_secs(10 * 60),
            frontend_url: "http://localhost:5500".to_string(),
            mail_relay_url: None,
            mail_from: "Qure Healthcare <no-reply@qure.local>".to_string(),
            password_iterations: 100_000,
        }
    }
}
