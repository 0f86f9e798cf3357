use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sea_orm::Set;
use uuid::Uuid;

use crate::contract::model::{NewNotification, Notification, RelatedEntity};
use crate::infra::storage::entity::{notification, outbox};

fn related(kind: Option<String>, id: Option<Uuid>) -> Option<RelatedEntity> {
    match (kind, id) {
        (Some(kind), Some(id)) => Some(RelatedEntity { kind, id }),
        _ => None,
    }
}

impl TryFrom<notification::Model> for Notification {
    type Error = anyhow::Error;

    fn try_from(m: notification::Model) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: m.id,
            user_id: m.user_id,
            kind: m.kind.parse().map_err(|e: String| anyhow!("notification {}: {e}", m.id))?,
            priority: m
                .priority
                .parse()
                .map_err(|e: String| anyhow!("notification {}: {e}", m.id))?,
            title: m.title,
            message: m.message,
            related: related(m.related_kind, m.related_id),
            read: m.is_read,
            read_at: m.read_at,
            created_at: m.created_at,
        })
    }
}

/// Fresh outbox row, due immediately.
pub fn outbox_row(id: Uuid, n: NewNotification, now: DateTime<Utc>) -> outbox::ActiveModel {
    let (related_kind, related_id) = match n.related {
        Some(r) => (Some(r.kind), Some(r.id)),
        None => (None, None),
    };
    outbox::ActiveModel {
        id: Set(id),
        user_id: Set(n.user_id),
        title: Set(n.title),
        message: Set(n.message),
        kind: Set(n.kind.as_str().to_string()),
        priority: Set(n.priority.as_str().to_string()),
        related_kind: Set(related_kind),
        related_id: Set(related_id),
        attempts: Set(0),
        next_attempt_at: Set(now),
        last_error: Set(None),
        dispatched_at: Set(None),
        created_at: Set(now),
    }
}

/// Feed row for an outbox row; rejects rows whose kind or priority is unknown.
pub fn materialize(row: &outbox::Model) -> anyhow::Result<notification::ActiveModel> {
    let kind: crate::contract::model::NotificationKind = row
        .kind
        .parse()
        .map_err(|e: String| anyhow!("outbox {}: {e}", row.id))?;
    let priority: crate::contract::model::Priority = row
        .priority
        .parse()
        .map_err(|e: String| anyhow!("outbox {}: {e}", row.id))?;
    Ok(notification::ActiveModel {
        id: Set(row.id),
        user_id: Set(row.user_id),
        title: Set(row.title.clone()),
        message: Set(row.message.clone()),
        kind: Set(kind.as_str().to_string()),
        priority: Set(priority.as_str().to_string()),
        related_kind: Set(row.related_kind.clone()),
        related_id: Set(row.related_id),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(row.created_at),
    })
}
