use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::contract::model::{Appointment, AppointmentStatus, Gender, PatientInfo};
use crate::domain::error::DomainError;
use crate::domain::model::{parse_date, parse_instant, AppointmentPatch, NewAppointment};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_appointment_date(value: &str) -> Result<(), ValidationError> {
    parse_instant(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Invalid appointment date"))
}

fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Invalid date of birth"))
}

fn validate_gender(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| invalid("gender", "Valid gender selection is required"))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfoDto {
    pub full_name: String,
    pub phone_number: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor: String,
    pub specialty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub appointment_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub patient_info: PatientInfoDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfoReq {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 10, max = 20, message = "Valid phone number is required"))]
    pub phone_number: String,
    /// `male`, `female`, `other` or `prefer-not-to-say`.
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[validate(custom(function = "validate_birth_date"))]
    pub date_of_birth: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentReq {
    #[validate(length(min = 1, max = 200, message = "Doctor name is required"))]
    pub doctor: String,
    #[validate(length(min = 1, max = 100, message = "Specialty is required"))]
    pub specialty: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    #[validate(custom(function = "validate_appointment_date"))]
    pub appointment_date: String,
    #[validate(length(min = 1, max = 32, message = "Appointment time is required"))]
    pub appointment_time: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub hospital_name: Option<String>,
    #[validate(nested)]
    pub patient_info: PatientInfoReq,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentReq {
    #[validate(length(min = 1, max = 200))]
    pub doctor: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub specialty: Option<String>,
    #[validate(custom(function = "validate_appointment_date"))]
    pub appointment_date: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub appointment_time: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub hospital_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsQuery {
    /// Comma-separated statuses, e.g. `scheduled,completed`.
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl From<PatientInfo> for PatientInfoDto {
    fn from(p: PatientInfo) -> Self {
        Self {
            full_name: p.full_name,
            phone_number: p.phone_number,
            gender: p.gender,
            date_of_birth: p.date_of_birth,
        }
    }
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.patient_id,
            doctor: a.doctor,
            specialty: a.specialty,
            hospital_name: a.hospital_name,
            appointment_date: a.appointment_date,
            appointment_time: a.appointment_time,
            notes: a.notes,
            status: a.status,
            patient_info: a.patient_info.into(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl TryFrom<CreateAppointmentReq> for NewAppointment {
    type Error = DomainError;

    fn try_from(req: CreateAppointmentReq) -> Result<Self, Self::Error> {
        let appointment_date = parse_instant(&req.appointment_date)
            .ok_or_else(|| DomainError::invalid("appointment_date", &req.appointment_date))?;
        let info = req.patient_info;
        let gender = info
            .gender
            .parse()
            .map_err(|_| DomainError::invalid("patient_info.gender", &info.gender))?;
        let date_of_birth = parse_date(&info.date_of_birth).ok_or_else(|| {
            DomainError::invalid("patient_info.date_of_birth", &info.date_of_birth)
        })?;
        Ok(Self {
            doctor: req.doctor,
            specialty: req.specialty,
            hospital_name: req.hospital_name,
            appointment_date,
            appointment_time: req.appointment_time,
            notes: req.notes,
            patient_info: PatientInfo {
                full_name: info.full_name,
                phone_number: info.phone_number,
                gender,
                date_of_birth,
            },
        })
    }
}

impl TryFrom<UpdateAppointmentReq> for AppointmentPatch {
    type Error = DomainError;

    fn try_from(req: UpdateAppointmentReq) -> Result<Self, Self::Error> {
        let appointment_date = req
            .appointment_date
            .as_deref()
            .map(|raw| parse_instant(raw).ok_or_else(|| DomainError::invalid("appointment_date", raw)))
            .transpose()?;
        Ok(Self {
            doctor: req.doctor,
            specialty: req.specialty,
            hospital_name: req.hospital_name,
            appointment_date,
            appointment_time: req.appointment_time,
            notes: req.notes,
        })
    }
}
