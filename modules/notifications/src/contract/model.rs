use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentConfirmed,
    AppointmentCancelled,
    AppointmentReminder,
    AppointmentCompleted,
    QueueUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentConfirmed => "appointment_confirmed",
            Self::AppointmentCancelled => "appointment_cancelled",
            Self::AppointmentReminder => "appointment_reminder",
            Self::AppointmentCompleted => "appointment_completed",
            Self::QueueUpdate => "queue_update",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "appointment_confirmed" => Self::AppointmentConfirmed,
            "appointment_cancelled" => Self::AppointmentCancelled,
            "appointment_reminder" => Self::AppointmentReminder,
            "appointment_completed" => Self::AppointmentCompleted,
            "queue_update" => Self::QueueUpdate,
            other => return Err(format!("unknown notification kind '{other}'")),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

/// What a notification is about, e.g. `{kind: "appointment", id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RelatedEntity {
    pub kind: String,
    pub id: Uuid,
}

/// Notification request staged by other modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub related: Option<RelatedEntity>,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
            priority: Priority::Normal,
            related: None,
        }
    }

    pub fn urgent(mut self) -> Self {
        self.priority = Priority::Urgent;
        self
    }

    pub fn related(mut self, kind: impl Into<String>, id: Uuid) -> Self {
        self.related = Some(RelatedEntity {
            kind: kind.into(),
            id,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub related: Option<RelatedEntity>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
