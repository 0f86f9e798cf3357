use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `modules.notifications` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotificationsConfig {
    /// Idle poll period of the dispatcher; staging wakes it earlier.
    #[serde(with = "humantime_serde")]
    pub dispatch_interval: Duration,
    pub batch_size: u64,
    /// Outbox rows are abandoned after this many failed deliveries.
    pub max_attempts: u32,
    /// Delay before retry `n` is `n × retry_backoff`.
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(2),
            batch_size: 50,
            max_attempts: 5,
            retry_backoff: Duration::from_secs(5),
        }
    }
}
