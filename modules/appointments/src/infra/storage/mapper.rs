use anyhow::anyhow;
use sea_orm::Set;

use crate::contract::model::{Appointment, PatientInfo};
use crate::infra::storage::entity;

impl TryFrom<entity::Model> for Appointment {
    type Error = anyhow::Error;

    fn try_from(m: entity::Model) -> Result<Self, Self::Error> {
        let invalid = |e: String| anyhow!("appointment {}: {e}", m.id);
        Ok(Appointment {
            id: m.id,
            patient_id: m.patient_id,
            status: m.status.parse().map_err(invalid)?,
            patient_info: PatientInfo {
                full_name: m.patient_full_name,
                phone_number: m.patient_phone,
                gender: m.patient_gender.parse().map_err(invalid)?,
                date_of_birth: m.patient_date_of_birth,
            },
            doctor: m.doctor,
            specialty: m.specialty,
            hospital_name: m.hospital_name,
            appointment_date: m.appointment_date,
            appointment_time: m.appointment_time,
            notes: m.notes,
            reminded_at: m.reminded_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<&Appointment> for entity::ActiveModel {
    fn from(a: &Appointment) -> Self {
        entity::ActiveModel {
            id: Set(a.id),
            patient_id: Set(a.patient_id),
            doctor: Set(a.doctor.clone()),
            specialty: Set(a.specialty.clone()),
            hospital_name: Set(a.hospital_name.clone()),
            appointment_date: Set(a.appointment_date),
            appointment_time: Set(a.appointment_time.clone()),
            notes: Set(a.notes.clone()),
            status: Set(a.status.as_str().to_string()),
            patient_full_name: Set(a.patient_info.full_name.clone()),
            patient_phone: Set(a.patient_info.phone_number.clone()),
            patient_gender: Set(a.patient_info.gender.as_str().to_string()),
            patient_date_of_birth: Set(a.patient_info.date_of_birth),
            reminded_at: Set(a.reminded_at),
            created_at: Set(a.created_at),
            updated_at: Set(a.updated_at),
        }
    }
}
