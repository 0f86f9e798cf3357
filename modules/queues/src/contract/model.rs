use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Called,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Called => "called",
            Self::Cancelled => "cancelled",
        }
    }

    /// Waiting and called entries count as the patient's current queue.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "called" => Ok(Self::Called),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown queue status '{other}'")),
        }
    }
}

/// Triage hint recorded at join time. It is shown to staff but does not
/// reorder the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl QueuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

impl std::str::FromStr for QueuePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            other => Err(format!("unknown queue priority '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub hospital_name: String,
    pub specialty: String,
    pub notes: Option<String>,
    pub priority: QueuePriority,
    /// 1-based place in the waiting partition. Frozen once the entry is
    /// called or cancelled.
    pub position: u32,
    /// Ticket label such as "C-002", fixed at join time.
    pub queue_number: String,
    pub status: QueueStatus,
    /// Minutes, as of the last join or status check.
    pub estimated_wait_time: u32,
    pub joined_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_the_only_inactive_status() {
        assert!(QueueStatus::Waiting.is_active());
        assert!(QueueStatus::Called.is_active());
        assert!(!QueueStatus::Cancelled.is_active());
    }

    #[test]
    fn priority_defaults_to_normal() {
        assert_eq!(QueuePriority::default(), QueuePriority::Normal);
        assert_eq!("emergency".parse::<QueuePriority>(), Ok(QueuePriority::Emergency));
        assert!("critical".parse::<QueuePriority>().is_err());
    }
}
