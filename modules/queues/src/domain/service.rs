use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use identity::client::IdentityApi;
use identity::model::UserProfile;
use modkit::api::{PageRequest, Pagination};
use notifications::client::NotificationsApi;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{QueueEntry, QueuePriority, QueueStatus};
use crate::domain::error::DomainError;
use crate::domain::model::{wait_minutes, JoinOutcome, NewQueueEntry, QueueStats};
use crate::domain::notices;
use crate::domain::repo::QueuesRepository;

const UNKNOWN_PATIENT: &str = "Unknown";

/// What a patient asks for when joining.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub hospital_name: String,
    pub specialty: String,
    pub notes: Option<String>,
    pub priority: QueuePriority,
}

/// Queue rules for patients and the staff desk.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn QueuesRepository>,
    identity: Arc<dyn IdentityApi>,
    notifications: Arc<dyn NotificationsApi>,
    minutes_per_patient: u32,
}

impl Service {
    pub fn new(
        repo: Arc<dyn QueuesRepository>,
        identity: Arc<dyn IdentityApi>,
        notifications: Arc<dyn NotificationsApi>,
        minutes_per_patient: u32,
    ) -> Self {
        Self {
            repo,
            identity,
            notifications,
            minutes_per_patient,
        }
    }

    async fn active_or_missing(&self, patient_id: Uuid) -> Result<QueueEntry, DomainError> {
        self.repo
            .active_for_patient(patient_id)
            .await
            .map_err(DomainError::database)?
            .ok_or(DomainError::NotInQueue)
    }

    async fn profiles(
        &self,
        entries: &[QueueEntry],
    ) -> Result<HashMap<Uuid, UserProfile>, DomainError> {
        let mut ids: Vec<Uuid> = entries.iter().map(|e| e.patient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles = self
            .identity
            .get_profiles(&ids)
            .await
            .map_err(DomainError::identity)?;
        Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
    }

    #[instrument(
        name = "queues.service.join",
        skip(self, req),
        fields(patient_id = %patient_id, hospital = %req.hospital_name, specialty = %req.specialty)
    )]
    pub async fn join(&self, patient_id: Uuid, req: JoinRequest) -> Result<QueueEntry, DomainError> {
        let new = NewQueueEntry {
            id: Uuid::new_v4(),
            patient_id,
            hospital_name: req.hospital_name,
            specialty: req.specialty,
            notes: req.notes,
            priority: req.priority,
            joined_at: Utc::now(),
        };
        let outcome = self
            .repo
            .join(new, self.minutes_per_patient, notices::joined)
            .await
            .map_err(DomainError::database)?;
        match outcome {
            JoinOutcome::Joined(entry) => {
                self.notifications.wake_dispatcher();
                info!(
                    entry_id = %entry.id,
                    position = entry.position,
                    queue_number = %entry.queue_number,
                    "patient joined queue"
                );
                Ok(entry)
            }
            JoinOutcome::AlreadyActive(existing) => {
                debug!(entry_id = %existing.id, "patient already in a queue");
                Err(DomainError::AlreadyInQueue {
                    existing: Box::new(existing),
                })
            }
        }
    }

    /// The patient's active entry with fresh partition stats. A changed wait
    /// estimate is written back.
    #[instrument(name = "queues.service.status", skip(self), fields(patient_id = %patient_id))]
    pub async fn status(&self, patient_id: Uuid) -> Result<(QueueEntry, QueueStats), DomainError> {
        let mut entry = self.active_or_missing(patient_id).await?;
        let (total, ahead) = self
            .repo
            .waiting_stats(&entry)
            .await
            .map_err(DomainError::database)?;

        // A called patient is at the desk; nobody is ahead any more.
        let ahead = if entry.status == QueueStatus::Waiting {
            ahead
        } else {
            0
        };
        let wait = wait_minutes(
            u32::try_from(ahead).unwrap_or(u32::MAX),
            self.minutes_per_patient,
        );
        if wait != entry.estimated_wait_time {
            self.repo
                .set_estimated_wait(entry.id, wait)
                .await
                .map_err(DomainError::database)?;
            entry.estimated_wait_time = wait;
        }
        Ok((
            entry,
            QueueStats {
                total_in_queue: total,
                ahead_in_queue: ahead,
                estimated_wait_time: wait,
            },
        ))
    }

    #[instrument(name = "queues.service.leave", skip(self), fields(patient_id = %patient_id))]
    pub async fn leave(&self, patient_id: Uuid) -> Result<QueueEntry, DomainError> {
        let entry = self
            .repo
            .leave(patient_id, Utc::now(), notices::left)
            .await
            .map_err(DomainError::database)?
            .ok_or(DomainError::NotInQueue)?;
        self.notifications.wake_dispatcher();
        info!(entry_id = %entry.id, "patient left queue");
        Ok(entry)
    }

    #[instrument(name = "queues.service.history", skip(self), fields(patient_id = %patient_id))]
    pub async fn history(
        &self,
        patient_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<QueueEntry>, Pagination), DomainError> {
        let (items, total) = self
            .repo
            .history(patient_id, page.offset(), page.limit)
            .await
            .map_err(DomainError::database)?;
        Ok((items, Pagination::new(page.page, page.limit, total)))
    }

    /// Staff view: waiting entries with the patient's profile when it exists.
    #[instrument(name = "queues.service.hospital_queue", skip(self))]
    pub async fn hospital_queue(
        &self,
        hospital_name: &str,
        specialty: Option<&str>,
    ) -> Result<Vec<(QueueEntry, Option<UserProfile>)>, DomainError> {
        let entries = self
            .repo
            .waiting(hospital_name, specialty)
            .await
            .map_err(DomainError::database)?;
        let profiles = self.profiles(&entries).await?;
        Ok(entries
            .into_iter()
            .map(|e| {
                let profile = profiles.get(&e.patient_id).cloned();
                (e, profile)
            })
            .collect())
    }

    /// Waiting and called entries with the patient's display name only.
    #[instrument(name = "queues.service.board", skip(self))]
    pub async fn board(
        &self,
        hospital_name: Option<&str>,
        specialty: Option<&str>,
    ) -> Result<Vec<(QueueEntry, String)>, DomainError> {
        let entries = self
            .repo
            .active(hospital_name, specialty)
            .await
            .map_err(DomainError::database)?;
        let profiles = self.profiles(&entries).await?;
        Ok(entries
            .into_iter()
            .map(|e| {
                let name = profiles
                    .get(&e.patient_id)
                    .map(UserProfile::full_name)
                    .unwrap_or_else(|| UNKNOWN_PATIENT.to_string());
                (e, name)
            })
            .collect())
    }

    #[instrument(name = "queues.service.call_next", skip(self), fields(staff_id = %staff_id))]
    pub async fn call_next(
        &self,
        staff_id: Uuid,
        hospital_name: &str,
        specialty: &str,
    ) -> Result<QueueEntry, DomainError> {
        let entry = self
            .repo
            .call_next(hospital_name, specialty, Utc::now(), notices::called)
            .await
            .map_err(DomainError::database)?
            .ok_or_else(|| DomainError::NoPatientsWaiting {
                hospital: hospital_name.to_string(),
                specialty: specialty.to_string(),
            })?;
        self.notifications.wake_dispatcher();
        info!(
            entry_id = %entry.id,
            queue_number = %entry.queue_number,
            "next patient called"
        );
        Ok(entry)
    }

    /// Every entry with the patient's profile; for troubleshooting only.
    #[instrument(name = "queues.service.dump", skip(self))]
    pub async fn dump(&self) -> Result<Vec<(QueueEntry, Option<UserProfile>)>, DomainError> {
        let entries = self.repo.all().await.map_err(DomainError::database)?;
        let profiles = self.profiles(&entries).await?;
        Ok(entries
            .into_iter()
            .map(|e| {
                let profile = profiles.get(&e.patient_id).cloned();
                (e, profile)
            })
            .collect())
    }

    pub async fn active_entry(&self, patient_id: Uuid) -> Result<Option<QueueEntry>, DomainError> {
        self.repo
            .active_for_patient(patient_id)
            .await
            .map_err(DomainError::database)
    }
}
