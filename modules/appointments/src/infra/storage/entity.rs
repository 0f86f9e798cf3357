use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor: String,
    pub specialty: String,
    pub hospital_name: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub appointment_time: String,
    pub notes: Option<String>,
    pub status: String,
    pub patient_full_name: String,
    pub patient_phone: String,
    pub patient_gender: String,
    pub patient_date_of_birth: NaiveDate,
    pub reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
