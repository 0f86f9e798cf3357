//! SeaORM adapter. Every write that moves positions runs in one transaction
//! with the outbox insert; replays on conflict come from `transact`.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modkit_db::{transact, TxPolicy};
use notifications::outbox;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::contract::model::{QueueEntry, QueueStatus};
use crate::domain::model::{JoinOutcome, NewQueueEntry};
use crate::domain::notices::NoticeFn;
use crate::domain::repo::QueuesRepository;
use crate::infra::storage::entity::{self, Column, Entity};
use crate::infra::storage::mapper::to_db_int;

const ACTIVE: [&str; 2] = ["waiting", "called"];

fn waiting_in(hospital_name: &str, specialty: &str) -> Condition {
    Condition::all()
        .add(Column::HospitalName.eq(hospital_name))
        .add(Column::Specialty.eq(specialty))
        .add(Column::Status.eq(QueueStatus::Waiting.as_str()))
}

async fn active_row<C: ConnectionTrait>(
    conn: &C,
    patient_id: Uuid,
) -> Result<Option<entity::Model>, DbErr> {
    Entity::find()
        .filter(Column::PatientId.eq(patient_id))
        .filter(Column::Status.is_in(ACTIVE))
        .order_by_desc(Column::JoinedAt)
        .one(conn)
        .await
}

/// Moves every waiting entry behind `position` one place forward.
async fn close_gap<C: ConnectionTrait>(
    conn: &C,
    entry: &QueueEntry,
    at: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let res = Entity::update_many()
        .col_expr(Column::Position, Expr::col(Column::Position).sub(1))
        .col_expr(Column::UpdatedAt, Expr::value(at))
        .filter(waiting_in(&entry.hospital_name, &entry.specialty))
        .filter(Column::Position.gt(to_db_int(entry.position)))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

fn to_entries(rows: Vec<entity::Model>) -> anyhow::Result<Vec<QueueEntry>> {
    rows.into_iter().map(QueueEntry::try_from).collect()
}

pub struct SeaOrmQueuesRepository {
    db: DatabaseConnection,
}

impl SeaOrmQueuesRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueuesRepository for SeaOrmQueuesRepository {
    async fn join(
        &self,
        new: NewQueueEntry,
        minutes_per_patient: u32,
        notice: NoticeFn,
    ) -> anyhow::Result<JoinOutcome> {
        let patient_id = new.patient_id;
        transact(&self.db, TxPolicy::default(), move |txn| {
            let new = new.clone();
            Box::pin(async move {
                if let Some(row) = active_row(txn, new.patient_id).await? {
                    return Ok(JoinOutcome::AlreadyActive(QueueEntry::try_from(row)?));
                }
                let last = Entity::find()
                    .filter(waiting_in(&new.hospital_name, &new.specialty))
                    .order_by_desc(Column::Position)
                    .one(txn)
                    .await?;
                let position = match last {
                    Some(row) => u32::try_from(row.position)? + 1,
                    None => 1,
                };
                let entry = new.admit(position, minutes_per_patient);
                entity::ActiveModel::from(&entry).insert(txn).await?;
                outbox::stage(txn, notice(&entry)).await?;
                Ok::<_, anyhow::Error>(JoinOutcome::Joined(entry))
            })
        })
        .await
        .with_context(|| format!("join queue for patient {patient_id} failed"))
    }

    async fn active_for_patient(&self, patient_id: Uuid) -> anyhow::Result<Option<QueueEntry>> {
        active_row(&self.db, patient_id)
            .await
            .context("find active queue entry failed")?
            .map(QueueEntry::try_from)
            .transpose()
    }

    async fn waiting_stats(&self, entry: &QueueEntry) -> anyhow::Result<(u64, u64)> {
        let partition = Entity::find().filter(waiting_in(&entry.hospital_name, &entry.specialty));
        let total = partition
            .clone()
            .count(&self.db)
            .await
            .context("count waiting entries failed")?;
        let ahead = partition
            .filter(Column::Position.lt(to_db_int(entry.position)))
            .count(&self.db)
            .await
            .context("count entries ahead failed")?;
        Ok((total, ahead))
    }

    async fn set_estimated_wait(&self, id: Uuid, minutes: u32) -> anyhow::Result<()> {
        Entity::update_many()
            .col_expr(Column::EstimatedWaitTime, Expr::value(to_db_int(minutes)))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .with_context(|| format!("update wait estimate of {id} failed"))?;
        Ok(())
    }

    async fn leave(
        &self,
        patient_id: Uuid,
        at: DateTime<Utc>,
        notice: NoticeFn,
    ) -> anyhow::Result<Option<QueueEntry>> {
        transact(&self.db, TxPolicy::default(), move |txn| {
            Box::pin(async move {
                let Some(row) = active_row(txn, patient_id).await? else {
                    return Ok(None);
                };
                let mut entry = QueueEntry::try_from(row)?;
                let was_waiting = entry.status == QueueStatus::Waiting;

                Entity::update_many()
                    .col_expr(Column::Status, Expr::value(QueueStatus::Cancelled.as_str()))
                    .col_expr(Column::CancelledAt, Expr::value(at))
                    .col_expr(Column::UpdatedAt, Expr::value(at))
                    .filter(Column::Id.eq(entry.id))
                    .exec(txn)
                    .await?;
                if was_waiting {
                    let moved = close_gap(txn, &entry, at).await?;
                    tracing::debug!(entry_id = %entry.id, moved, "queue gap closed after leave");
                }

                entry.status = QueueStatus::Cancelled;
                entry.cancelled_at = Some(at);
                entry.updated_at = at;
                outbox::stage(txn, notice(&entry)).await?;
                Ok::<_, anyhow::Error>(Some(entry))
            })
        })
        .await
        .with_context(|| format!("leave queue for patient {patient_id} failed"))
    }

    async fn history(
        &self,
        patient_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<QueueEntry>, u64)> {
        let query = Entity::find().filter(Column::PatientId.eq(patient_id));
        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count queue history failed")?;
        let rows = query
            .order_by_desc(Column::JoinedAt)
            .order_by_desc(Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list queue history failed")?;
        Ok((to_entries(rows)?, total))
    }

    async fn waiting(
        &self,
        hospital_name: &str,
        specialty: Option<&str>,
    ) -> anyhow::Result<Vec<QueueEntry>> {
        let mut query = Entity::find()
            .filter(Column::HospitalName.eq(hospital_name))
            .filter(Column::Status.eq(QueueStatus::Waiting.as_str()));
        if let Some(specialty) = specialty {
            query = query.filter(Column::Specialty.eq(specialty));
        }
        let rows = query
            .order_by_asc(Column::Specialty)
            .order_by_asc(Column::Position)
            .all(&self.db)
            .await
            .context("list waiting entries failed")?;
        to_entries(rows)
    }

    async fn active(
        &self,
        hospital_name: Option<&str>,
        specialty: Option<&str>,
    ) -> anyhow::Result<Vec<QueueEntry>> {
        let mut query = Entity::find().filter(Column::Status.is_in(ACTIVE));
        if let Some(hospital_name) = hospital_name {
            query = query.filter(Column::HospitalName.eq(hospital_name));
        }
        if let Some(specialty) = specialty {
            query = query.filter(Column::Specialty.eq(specialty));
        }
        // "called" sorts before "waiting": whoever is at the desk comes first.
        let rows = query
            .order_by_asc(Column::HospitalName)
            .order_by_asc(Column::Specialty)
            .order_by_asc(Column::Status)
            .order_by_asc(Column::Position)
            .all(&self.db)
            .await
            .context("list active entries failed")?;
        to_entries(rows)
    }

    async fn call_next(
        &self,
        hospital_name: &str,
        specialty: &str,
        at: DateTime<Utc>,
        notice: NoticeFn,
    ) -> anyhow::Result<Option<QueueEntry>> {
        let (hospital, spec) = (hospital_name.to_string(), specialty.to_string());
        transact(&self.db, TxPolicy::default(), move |txn| {
            let (hospital, spec) = (hospital.clone(), spec.clone());
            Box::pin(async move {
                let Some(row) = Entity::find()
                    .filter(waiting_in(&hospital, &spec))
                    .order_by_asc(Column::JoinedAt)
                    .order_by_asc(Column::Position)
                    .order_by_asc(Column::Id)
                    .one(txn)
                    .await?
                else {
                    return Ok(None);
                };
                let mut entry = QueueEntry::try_from(row)?;

                Entity::update_many()
                    .col_expr(Column::Status, Expr::value(QueueStatus::Called.as_str()))
                    .col_expr(Column::CalledAt, Expr::value(at))
                    .col_expr(Column::EstimatedWaitTime, Expr::value(0))
                    .col_expr(Column::UpdatedAt, Expr::value(at))
                    .filter(Column::Id.eq(entry.id))
                    .exec(txn)
                    .await?;
                close_gap(txn, &entry, at).await?;

                entry.status = QueueStatus::Called;
                entry.called_at = Some(at);
                entry.estimated_wait_time = 0;
                entry.updated_at = at;
                outbox::stage(txn, notice(&entry)).await?;
                Ok::<_, anyhow::Error>(Some(entry))
            })
        })
        .await
        .with_context(|| format!("call next in {hospital_name} / {specialty} failed"))
    }

    async fn all(&self) -> anyhow::Result<Vec<QueueEntry>> {
        let rows = Entity::find()
            .order_by_desc(Column::JoinedAt)
            .all(&self.db)
            .await
            .context("dump queue entries failed")?;
        to_entries(rows)
    }
}
