use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::QueueEntry;
use crate::domain::model::{JoinOutcome, NewQueueEntry};
use crate::domain::notices::NoticeFn;

/// Storage port. Position bookkeeping and the notification for each change
/// commit in one transaction.
#[async_trait]
pub trait QueuesRepository: Send + Sync {
    /// Appends the request to its waiting partition at max position + 1,
    /// unless the patient already holds an active entry.
    async fn join(
        &self,
        new: NewQueueEntry,
        minutes_per_patient: u32,
        notice: NoticeFn,
    ) -> anyhow::Result<JoinOutcome>;

    async fn active_for_patient(&self, patient_id: Uuid) -> anyhow::Result<Option<QueueEntry>>;

    /// Waiting entries in the entry's partition, and how many of them sit
    /// in front of it.
    async fn waiting_stats(&self, entry: &QueueEntry) -> anyhow::Result<(u64, u64)>;

    async fn set_estimated_wait(&self, id: Uuid, minutes: u32) -> anyhow::Result<()>;

    /// Cancels the patient's active entry. A waiting entry's followers move
    /// up by one. Returns the cancelled entry, or `None` if there was none.
    async fn leave(
        &self,
        patient_id: Uuid,
        at: DateTime<Utc>,
        notice: NoticeFn,
    ) -> anyhow::Result<Option<QueueEntry>>;

    /// Every entry of the patient, newest first, and the total count.
    async fn history(
        &self,
        patient_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<QueueEntry>, u64)>;

    /// Waiting entries of a hospital by position, optionally one specialty.
    async fn waiting(
        &self,
        hospital_name: &str,
        specialty: Option<&str>,
    ) -> anyhow::Result<Vec<QueueEntry>>;

    /// Waiting and called entries, optionally narrowed.
    async fn active(
        &self,
        hospital_name: Option<&str>,
        specialty: Option<&str>,
    ) -> anyhow::Result<Vec<QueueEntry>>;

    /// Flips the earliest joined waiting entry to called and closes its gap.
    async fn call_next(
        &self,
        hospital_name: &str,
        specialty: &str,
        at: DateTime<Utc>,
        notice: NoticeFn,
    ) -> anyhow::Result<Option<QueueEntry>>;

    /// Every entry, newest first.
    async fn all(&self) -> anyhow::Result<Vec<QueueEntry>>;
}
