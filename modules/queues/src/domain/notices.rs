//! Patient notifications for queue transitions. Storage stages them in the
//! same transaction as the change they describe.

use notifications::model::{NewNotification, NotificationKind};

use crate::contract::model::QueueEntry;

/// Builds the notification for a queue change from the entry as stored.
pub type NoticeFn = fn(&QueueEntry) -> NewNotification;

const RELATED_KIND: &str = "queue";

fn note(entry: &QueueEntry, title: &str, message: String) -> NewNotification {
    NewNotification::new(entry.patient_id, NotificationKind::QueueUpdate, title, message)
        .related(RELATED_KIND, entry.id)
}

pub fn joined(entry: &QueueEntry) -> NewNotification {
    note(
        entry,
        "Joined Queue",
        format!(
            "You have joined the {} queue at {}. Your queue number is {}.",
            entry.specialty, entry.hospital_name, entry.queue_number
        ),
    )
}

pub fn left(entry: &QueueEntry) -> NewNotification {
    note(
        entry,
        "Left Queue",
        format!(
            "You have left the {} queue at {}.",
            entry.specialty, entry.hospital_name
        ),
    )
}

pub fn called(entry: &QueueEntry) -> NewNotification {
    note(
        entry,
        "You're Next!",
        format!(
            "You have been called for your {} appointment at {}. Please proceed to the consultation room.",
            entry.specialty, entry.hospital_name
        ),
    )
    .urgent()
}
