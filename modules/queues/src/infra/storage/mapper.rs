use anyhow::anyhow;
use sea_orm::Set;

use crate::contract::model::QueueEntry;
use crate::infra::storage::entity;

/// Counters are `u32` in the domain and `INTEGER` in storage.
pub(crate) fn to_db_int(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl TryFrom<entity::Model> for QueueEntry {
    type Error = anyhow::Error;

    fn try_from(m: entity::Model) -> Result<Self, Self::Error> {
        let invalid = |e: String| anyhow!("queue entry {}: {e}", m.id);
        Ok(QueueEntry {
            id: m.id,
            patient_id: m.patient_id,
            status: m.status.parse().map_err(invalid)?,
            priority: m.priority.parse().map_err(invalid)?,
            position: u32::try_from(m.position)
                .map_err(|_| anyhow!("queue entry {}: negative position {}", m.id, m.position))?,
            estimated_wait_time: u32::try_from(m.estimated_wait_time).unwrap_or(0),
            hospital_name: m.hospital_name,
            specialty: m.specialty,
            notes: m.notes,
            queue_number: m.queue_number,
            joined_at: m.joined_at,
            called_at: m.called_at,
            cancelled_at: m.cancelled_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<&QueueEntry> for entity::ActiveModel {
    fn from(e: &QueueEntry) -> Self {
        entity::ActiveModel {
            id: Set(e.id),
            patient_id: Set(e.patient_id),
            hospital_name: Set(e.hospital_name.clone()),
            specialty: Set(e.specialty.clone()),
            notes: Set(e.notes.clone()),
            priority: Set(e.priority.as_str().to_string()),
            position: Set(to_db_int(e.position)),
            queue_number: Set(e.queue_number.clone()),
            status: Set(e.status.as_str().to_string()),
            estimated_wait_time: Set(to_db_int(e.estimated_wait_time)),
            joined_at: Set(e.joined_at),
            called_at: Set(e.called_at),
            cancelled_at: Set(e.cancelled_at),
            updated_at: Set(e.updated_at),
        }
    }
}
