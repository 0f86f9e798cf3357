use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifications::model::NewNotification;
use uuid::Uuid;

use crate::contract::model::{Appointment, AppointmentStatus};

/// Storage port. Every write takes the notification it causes and stages it
/// in the same transaction.
#[async_trait]
pub trait AppointmentsRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Appointment>>;

    /// Page of a patient's appointments by date ascending; an empty
    /// `statuses` means any status. Returns the page and the total count.
    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        statuses: &[AppointmentStatus],
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Appointment>, u64)>;

    async fn insert(&self, appointment: &Appointment, note: NewNotification) -> anyhow::Result<()>;

    /// Overwrites the row only while its stored status is still `expected`.
    /// Returns `false`, with nothing staged, when the status moved meanwhile.
    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
        note: NewNotification,
    ) -> anyhow::Result<bool>;

    /// Scheduled, not yet reminded appointments dated in `[from, until]`.
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u64,
    ) -> anyhow::Result<Vec<Appointment>>;

    /// Stamps `reminded_at` unless already set; `false` means another pass won.
    async fn mark_reminded(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        note: NewNotification,
    ) -> anyhow::Result<bool>;
}
