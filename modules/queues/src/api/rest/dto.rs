use std::borrow::Cow;

use chrono::{DateTime, Utc};
use identity::model::UserProfile;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::contract::model::{QueueEntry, QueuePriority, QueueStatus};
use crate::domain::model::QueueStats;
use crate::domain::service::JoinRequest;

fn validate_priority(value: &str) -> Result<(), ValidationError> {
    value.parse::<QueuePriority>().map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("priority");
        err.message = Some(Cow::Borrowed(
            "Priority must be one of normal, urgent or emergency",
        ));
        err
    })
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryDto {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub hospital_name: String,
    pub specialty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub priority: QueuePriority,
    pub position: u32,
    pub queue_number: String,
    pub status: QueueStatus,
    /// Minutes.
    pub estimated_wait_time: u32,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatsDto {
    pub total_in_queue: u64,
    pub ahead_in_queue: u64,
    pub estimated_wait_time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusDto {
    #[serde(flatten)]
    pub entry: QueueEntryDto,
    pub queue_stats: QueueStatsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummaryDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Staff view of an entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffQueueEntryDto {
    #[serde(flatten)]
    pub entry: QueueEntryDto,
    /// Absent when the patient account no longer exists.
    pub patient: Option<PatientSummaryDto>,
}

/// Waiting-room board row; carries no contact details.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntryDto {
    pub id: Uuid,
    pub queue_number: String,
    pub position: u32,
    pub specialty: String,
    pub hospital_name: String,
    pub status: QueueStatus,
    pub estimated_wait_time: u32,
    pub joined_at: DateTime<Utc>,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DebugDumpDto {
    pub total: usize,
    pub entries: Vec<StaffQueueEntryDto>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueReq {
    #[validate(length(min = 1, max = 200, message = "Hospital name is required"))]
    pub hospital_name: String,
    #[validate(length(min = 1, max = 100, message = "Specialty is required"))]
    pub specialty: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    /// `normal` (default), `urgent` or `emergency`.
    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CallNextReq {
    #[validate(length(max = 200))]
    pub hospital_name: Option<String>,
    #[validate(length(max = 100))]
    pub specialty: Option<String>,
}

impl CallNextReq {
    /// Both names, trimmed, when present and non-empty.
    pub fn target(&self) -> Option<(String, String)> {
        Some((
            trimmed(self.hospital_name.clone())?,
            trimmed(self.specialty.clone())?,
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueFilterQuery {
    pub hospital_name: Option<String>,
    pub specialty: Option<String>,
}

impl QueueFilterQuery {
    pub fn hospital(&self) -> Option<String> {
        trimmed(self.hospital_name.clone())
    }

    pub fn specialty(&self) -> Option<String> {
        trimmed(self.specialty.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl From<QueueEntry> for QueueEntryDto {
    fn from(e: QueueEntry) -> Self {
        Self {
            id: e.id,
            patient_id: e.patient_id,
            hospital_name: e.hospital_name,
            specialty: e.specialty,
            notes: e.notes,
            priority: e.priority,
            position: e.position,
            queue_number: e.queue_number,
            status: e.status,
            estimated_wait_time: e.estimated_wait_time,
            joined_at: e.joined_at,
            called_at: e.called_at,
            cancelled_at: e.cancelled_at,
        }
    }
}

impl From<QueueStats> for QueueStatsDto {
    fn from(s: QueueStats) -> Self {
        Self {
            total_in_queue: s.total_in_queue,
            ahead_in_queue: s.ahead_in_queue,
            estimated_wait_time: s.estimated_wait_time,
        }
    }
}

impl From<UserProfile> for PatientSummaryDto {
    fn from(p: UserProfile) -> Self {
        Self {
            first_name: p.first_name,
            last_name: p.last_name,
            email: p.email,
            phone: p.phone,
        }
    }
}

impl From<(QueueEntry, Option<UserProfile>)> for StaffQueueEntryDto {
    fn from((entry, profile): (QueueEntry, Option<UserProfile>)) -> Self {
        Self {
            entry: entry.into(),
            patient: profile.map(Into::into),
        }
    }
}

impl From<(QueueEntry, String)> for BoardEntryDto {
    fn from((e, patient_name): (QueueEntry, String)) -> Self {
        Self {
            id: e.id,
            queue_number: e.queue_number,
            position: e.position,
            specialty: e.specialty,
            hospital_name: e.hospital_name,
            status: e.status,
            estimated_wait_time: e.estimated_wait_time,
            joined_at: e.joined_at,
            patient_name,
        }
    }
}

impl From<JoinQueueReq> for JoinRequest {
    fn from(req: JoinQueueReq) -> Self {
        Self {
            hospital_name: req.hospital_name.trim().to_string(),
            specialty: req.specialty.trim().to_string(),
            notes: trimmed(req.notes),
            priority: req
                .priority
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
        }
    }
}
