//! Transactional staging of notifications.
//!
//! ```rust,ignore
//! modkit_db::transact(&db, TxPolicy::default(), |txn| Box::pin(async move {
//!     appointment.insert(txn).await?;
//!     notifications::outbox::stage(txn, note.clone()).await?;
//!     Ok(())
//! }))
//! .await?;
//! ```

use chrono::Utc;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait};
use uuid::Uuid;

use crate::contract::model::NewNotification;
use crate::infra::storage::entity::outbox;
use crate::infra::storage::mapper::outbox_row;

/// Insert `notification` into the outbox on `conn`, usually the caller's open
/// transaction, so it commits or rolls back with the caller's own change.
pub async fn stage<C>(conn: &C, notification: NewNotification) -> Result<Uuid, DbErr>
where
    C: ConnectionTrait,
{
    let id = Uuid::new_v4();
    outbox::Entity::insert(outbox_row(id, notification, Utc::now()))
        .exec_without_returning(conn)
        .await?;
    tracing::debug!(outbox_id = %id, "notification staged");
    Ok(id)
}
