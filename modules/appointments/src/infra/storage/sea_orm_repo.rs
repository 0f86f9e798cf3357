//! SeaORM adapter. Writes run in one transaction with the outbox insert.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modkit_db::{transact, TxPolicy};
use notifications::model::NewNotification;
use notifications::outbox;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::contract::model::{Appointment, AppointmentStatus};
use crate::domain::repo::AppointmentsRepository;
use crate::infra::storage::entity::{self, Column, Entity};

pub struct SeaOrmAppointmentsRepository {
    db: DatabaseConnection,
}

impl SeaOrmAppointmentsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AppointmentsRepository for SeaOrmAppointmentsRepository {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Appointment>> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find appointment failed")?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
        statuses: &[AppointmentStatus],
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Appointment>, u64)> {
        let mut query = Entity::find().filter(Column::PatientId.eq(patient_id));
        if !statuses.is_empty() {
            query = query.filter(Column::Status.is_in(statuses.iter().map(|s| s.as_str())));
        }
        let total = query
            .clone()
            .count(&self.db)
            .await
            .context("count appointments failed")?;
        let rows = query
            .order_by_asc(Column::AppointmentDate)
            .order_by_asc(Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list appointments failed")?;
        let items = rows
            .into_iter()
            .map(Appointment::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn insert(&self, appointment: &Appointment, note: NewNotification) -> anyhow::Result<()> {
        let row = entity::ActiveModel::from(appointment);
        transact(&self.db, TxPolicy::default(), move |txn| {
            let row = row.clone();
            let note = note.clone();
            Box::pin(async move {
                row.insert(txn).await?;
                outbox::stage(txn, note).await?;
                Ok::<_, anyhow::Error>(())
            })
        })
        .await
        .with_context(|| format!("insert appointment {} failed", appointment.id))
    }

    async fn save_if_status(
        &self,
        appointment: &Appointment,
        expected: AppointmentStatus,
        note: NewNotification,
    ) -> anyhow::Result<bool> {
        let a = appointment.clone();
        transact(&self.db, TxPolicy::default(), move |txn| {
            let a = a.clone();
            let note = note.clone();
            Box::pin(async move {
                let res = Entity::update_many()
                    .col_expr(Column::Doctor, Expr::value(a.doctor))
                    .col_expr(Column::Specialty, Expr::value(a.specialty))
                    .col_expr(Column::HospitalName, Expr::value(a.hospital_name))
                    .col_expr(Column::AppointmentDate, Expr::value(a.appointment_date))
                    .col_expr(Column::AppointmentTime, Expr::value(a.appointment_time))
                    .col_expr(Column::Notes, Expr::value(a.notes))
                    .col_expr(Column::Status, Expr::value(a.status.as_str()))
                    .col_expr(Column::RemindedAt, Expr::value(a.reminded_at))
                    .col_expr(Column::UpdatedAt, Expr::value(a.updated_at))
                    .filter(Column::Id.eq(a.id))
                    .filter(Column::Status.eq(expected.as_str()))
                    .exec(txn)
                    .await?;
                if res.rows_affected == 0 {
                    return Ok(false);
                }
                outbox::stage(txn, note).await?;
                Ok::<_, anyhow::Error>(true)
            })
        })
        .await
        .with_context(|| format!("save appointment {} failed", appointment.id))
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u64,
    ) -> anyhow::Result<Vec<Appointment>> {
        let rows = Entity::find()
            .filter(Column::Status.eq(AppointmentStatus::Scheduled.as_str()))
            .filter(Column::RemindedAt.is_null())
            .filter(Column::AppointmentDate.gte(from))
            .filter(Column::AppointmentDate.lte(until))
            .order_by_asc(Column::AppointmentDate)
            .limit(limit)
            .all(&self.db)
            .await
            .context("load due reminders failed")?;
        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn mark_reminded(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        note: NewNotification,
    ) -> anyhow::Result<bool> {
        transact(&self.db, TxPolicy::default(), move |txn| {
            let note = note.clone();
            Box::pin(async move {
                let res = Entity::update_many()
                    .col_expr(Column::RemindedAt, Expr::value(at))
                    .filter(Column::Id.eq(id))
                    .filter(Column::RemindedAt.is_null())
                    .filter(Column::Status.eq(AppointmentStatus::Scheduled.as_str()))
                    .exec(txn)
                    .await?;
                if res.rows_affected == 0 {
                    return Ok(false);
                }
                outbox::stage(txn, note).await?;
                Ok::<_, anyhow::Error>(true)
            })
        })
        .await
        .with_context(|| format!("mark appointment {id} reminded failed"))
    }
}
