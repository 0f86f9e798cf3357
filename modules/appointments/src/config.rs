use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `modules.appointments` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppointmentsConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// How often the reminder worker looks for upcoming appointments.
    #[serde(with = "humantime_serde")]
    pub reminder_interval: Duration,
    /// Appointments starting within this window get a reminder.
    #[serde(with = "humantime_serde")]
    pub reminder_lead: Duration,
    pub reminders_enabled: bool,
}

impl Default for AppointmentsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            reminder_interval: Duration::from_secs(10 * 60),
            reminder_lead: Duration::from_secs(24 * 60 * 60),
            reminders_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_accepts_humantime() {
        let cfg: AppointmentsConfig =
            serde_json::from_value(serde_json::json!({ "reminder_lead": "2h", "max_page_size": 50 }))
                .unwrap();
        assert_eq!(cfg.reminder_lead, Duration::from_secs(7200));
        assert_eq!(cfg.max_page_size, 50);
        assert_eq!(cfg.default_page_size, 10);
        assert!(cfg.reminders_enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res = serde_json::from_value::<AppointmentsConfig>(serde_json::json!({ "page": 1 }));
        assert!(res.is_err());
    }
}
