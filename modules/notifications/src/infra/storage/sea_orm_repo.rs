//! SeaORM adapter for the feed and the outbox.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modkit_db::{transact, TxPolicy};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::contract::model::Notification;
use crate::domain::repo::{NotificationsRepository, OutboxRepository, PendingDelivery};
use crate::infra::storage::entity::{notification, outbox};
use crate::infra::storage::mapper::materialize;

/// Holds the pool connection; outbox delivery opens its own transactions.
pub struct SeaOrmNotificationsRepository {
    db: DatabaseConnection,
}

impl SeaOrmNotificationsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationsRepository for SeaOrmNotificationsRepository {
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Notification>, u64)> {
        let mut query = notification::Entity::find().filter(notification::Column::UserId.eq(user_id));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count notifications failed")?;
        let rows = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list notifications failed")?;
        let items = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn unread_count(&self, user_id: Uuid) -> anyhow::Result<u64> {
        notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db)
            .await
            .context("unread_count failed")
    }

    async fn mark_read(
        &self,
        user_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Notification>> {
        notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(at))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await
            .context("mark_read failed")?;

        notification::Entity::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .context("mark_read reload failed")?
            .map(Notification::try_from)
            .transpose()
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<u64> {
        let res = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(at))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await
            .context("mark_all_read failed")?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl OutboxRepository for SeaOrmNotificationsRepository {
    async fn due(
        &self,
        now: DateTime<Utc>,
        max_attempts: u32,
        limit: u64,
    ) -> anyhow::Result<Vec<PendingDelivery>> {
        let max_attempts = i32::try_from(max_attempts).unwrap_or(i32::MAX);
        let rows = outbox::Entity::find()
            .filter(outbox::Column::DispatchedAt.is_null())
            .filter(outbox::Column::Attempts.lt(max_attempts))
            .filter(outbox::Column::NextAttemptAt.lte(now))
            .order_by_asc(outbox::Column::CreatedAt)
            .order_by_asc(outbox::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("load due outbox rows failed")?;
        Ok(rows
            .into_iter()
            .map(|r| PendingDelivery {
                id: r.id,
                attempts: u32::try_from(r.attempts).unwrap_or(0),
            })
            .collect())
    }

    async fn deliver(&self, id: Uuid, now: DateTime<Utc>) -> anyhow::Result<bool> {
        transact(&self.db, TxPolicy::default(), move |txn| {
            Box::pin(async move {
                let Some(row) = outbox::Entity::find_by_id(id).one(txn).await? else {
                    return Ok(false);
                };
                if row.dispatched_at.is_some() {
                    return Ok(false);
                }

                notification::Entity::insert(materialize(&row)?)
                    .on_conflict(
                        OnConflict::column(notification::Column::Id)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;
                let marked = outbox::Entity::update_many()
                    .col_expr(outbox::Column::DispatchedAt, Expr::value(now))
                    .filter(outbox::Column::Id.eq(id))
                    .filter(outbox::Column::DispatchedAt.is_null())
                    .exec(txn)
                    .await?;
                Ok::<_, anyhow::Error>(marked.rows_affected > 0)
            })
        })
        .await
        .with_context(|| format!("deliver outbox row {id} failed"))
    }

    async fn record_failure(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> anyhow::Result<()> {
        outbox::Entity::update_many()
            .col_expr(
                outbox::Column::Attempts,
                Expr::value(i32::try_from(attempts).unwrap_or(i32::MAX)),
            )
            .col_expr(outbox::Column::NextAttemptAt, Expr::value(next_attempt_at))
            .col_expr(outbox::Column::LastError, Expr::value(error))
            .filter(outbox::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("record_failure failed")?;
        Ok(())
    }
}
