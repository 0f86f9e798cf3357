use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::contract::model::{AppointmentStatus, PatientInfo};
use crate::domain::error::DomainError;

/// Booking request after parsing; the service checks the date is ahead.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor: String,
    pub specialty: String,
    pub hospital_name: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub appointment_time: String,
    pub notes: Option<String>,
    pub patient_info: PatientInfo,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub doctor: Option<String>,
    pub specialty: Option<String>,
    pub hospital_name: Option<String>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.doctor.is_none()
            && self.specialty.is_none()
            && self.hospital_name.is_none()
            && self.appointment_date.is_none()
            && self.appointment_time.is_none()
            && self.notes.is_none()
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) and bare
/// `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_instant(raw).map(|ts| ts.date_naive())
}

/// `status=scheduled,completed` → both statuses; blank entries are ignored.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Vec<AppointmentStatus>, DomainError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let status = part
            .parse::<AppointmentStatus>()
            .map_err(|_| DomainError::invalid("status", part))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}
