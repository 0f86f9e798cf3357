use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{QueueEntry, QueuePriority, QueueStatus};

/// Ticket label: upper-cased first letter of the specialty, a dash and the
/// position padded to three digits ("C-002"). Longer positions are not cut.
pub fn queue_number(specialty: &str, position: u32) -> String {
    let initial: String = specialty
        .trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "Q".to_string());
    format!("{initial}-{position:03}")
}

/// Minutes a patient `ahead` places from the front is expected to wait.
pub fn wait_minutes(ahead: u32, minutes_per_patient: u32) -> u32 {
    ahead.saturating_mul(minutes_per_patient)
}

/// A validated join request, stamped with the entry's id and join time.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub hospital_name: String,
    pub specialty: String,
    pub notes: Option<String>,
    pub priority: QueuePriority,
    pub joined_at: DateTime<Utc>,
}

impl NewQueueEntry {
    /// The waiting entry this request becomes at `position`.
    pub fn admit(&self, position: u32, minutes_per_patient: u32) -> QueueEntry {
        QueueEntry {
            id: self.id,
            patient_id: self.patient_id,
            hospital_name: self.hospital_name.clone(),
            specialty: self.specialty.clone(),
            notes: self.notes.clone(),
            priority: self.priority,
            position,
            queue_number: queue_number(&self.specialty, position),
            status: QueueStatus::Waiting,
            estimated_wait_time: wait_minutes(position.saturating_sub(1), minutes_per_patient),
            joined_at: self.joined_at,
            called_at: None,
            cancelled_at: None,
            updated_at: self.joined_at,
        }
    }
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Joined(QueueEntry),
    /// The patient already held this waiting or called entry; nothing written.
    AlreadyActive(QueueEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub total_in_queue: u64,
    pub ahead_in_queue: u64,
    pub estimated_wait_time: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_numbers_use_specialty_initial_and_padding() {
        assert_eq!(queue_number("Cardiology", 2), "C-002");
        assert_eq!(queue_number("  dermatology", 17), "D-017");
        assert_eq!(queue_number("Orthopedics", 1234), "O-1234");
        assert_eq!(queue_number("", 1), "Q-001");
    }

    #[test]
    fn admitted_entry_waits_for_everyone_ahead() {
        let new = NewQueueEntry {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            hospital_name: "General Hospital".into(),
            specialty: "Cardiology".into(),
            notes: None,
            priority: QueuePriority::Urgent,
            joined_at: Utc::now(),
        };
        let first = new.admit(1, 15);
        assert_eq!(first.estimated_wait_time, 0);
        assert_eq!(first.status, QueueStatus::Waiting);

        let third = new.admit(3, 15);
        assert_eq!(third.queue_number, "C-003");
        assert_eq!(third.estimated_wait_time, 30);
        assert_eq!(third.priority, QueuePriority::Urgent);
    }

    #[test]
    fn wait_estimate_saturates() {
        assert_eq!(wait_minutes(u32::MAX, 15), u32::MAX);
        assert_eq!(wait_minutes(4, 10), 40);
    }
}
