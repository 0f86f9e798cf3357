use serde::{Deserialize, Serialize};

/// `modules.queues` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueuesConfig {
    /// Wait estimate per patient ahead, in minutes.
    pub minutes_per_patient: u32,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Exposes `GET /api/queues/debug`, which dumps every entry.
    pub enable_debug_endpoint: bool,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            minutes_per_patient: 15,
            default_page_size: 10,
            max_page_size: 100,
            enable_debug_endpoint: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_endpoint_is_off_by_default() {
        let cfg: QueuesConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!cfg.enable_debug_endpoint);
        assert_eq!(cfg.minutes_per_patient, 15);
    }
}
