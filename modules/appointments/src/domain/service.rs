use std::sync::Arc;

use chrono::{DateTime, Utc};
use modkit::api::{PageRequest, Pagination};
use notifications::model::{NewNotification, NotificationKind};
use notifications::client::NotificationsApi;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{Appointment, AppointmentStatus};
use crate::domain::error::DomainError;
use crate::domain::model::{AppointmentPatch, NewAppointment};
use crate::domain::repo::AppointmentsRepository;

const RELATED_KIND: &str = "appointment";

fn display_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a %b %d %Y").to_string()
}

/// Booking rules for patients plus staff completion and reminders.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn AppointmentsRepository>,
    notifications: Arc<dyn NotificationsApi>,
}

impl Service {
    pub fn new(
        repo: Arc<dyn AppointmentsRepository>,
        notifications: Arc<dyn NotificationsApi>,
    ) -> Self {
        Self {
            repo,
            notifications,
        }
    }

    fn note(
        appointment: &Appointment,
        kind: NotificationKind,
        title: &str,
        message: String,
    ) -> NewNotification {
        NewNotification::new(appointment.patient_id, kind, title, message)
            .related(RELATED_KIND, appointment.id)
    }

    async fn owned(&self, patient_id: Uuid, id: Uuid) -> Result<Appointment, DomainError> {
        self.repo
            .find(id)
            .await
            .map_err(DomainError::database)?
            .filter(|a| a.patient_id == patient_id)
            .ok_or_else(|| DomainError::not_found(id))
    }

    /// Writes `next` if the stored row is still scheduled, then wakes the
    /// notification dispatcher.
    async fn transition(
        &self,
        next: &Appointment,
        note: NewNotification,
    ) -> Result<(), DomainError> {
        let saved = self
            .repo
            .save_if_status(next, AppointmentStatus::Scheduled, note)
            .await
            .map_err(DomainError::database)?;
        if !saved {
            return Err(DomainError::Conflict { id: next.id });
        }
        self.notifications.wake_dispatcher();
        Ok(())
    }

    #[instrument(name = "appointments.service.create", skip(self, new), fields(patient_id = %patient_id))]
    pub async fn create(
        &self,
        patient_id: Uuid,
        new: NewAppointment,
    ) -> Result<Appointment, DomainError> {
        let now = Utc::now();
        if new.appointment_date < now {
            return Err(DomainError::DateInPast);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor: new.doctor,
            specialty: new.specialty,
            hospital_name: new.hospital_name,
            appointment_date: new.appointment_date,
            appointment_time: new.appointment_time,
            notes: new.notes,
            status: AppointmentStatus::Scheduled,
            patient_info: new.patient_info,
            reminded_at: None,
            created_at: now,
            updated_at: now,
        };
        let note = Self::note(
            &appointment,
            NotificationKind::AppointmentConfirmed,
            "Appointment Scheduled",
            format!(
                "Your appointment with {} on {} at {} has been scheduled.",
                appointment.doctor,
                display_date(&appointment.appointment_date),
                appointment.appointment_time
            ),
        );
        self.repo
            .insert(&appointment, note)
            .await
            .map_err(DomainError::database)?;
        self.notifications.wake_dispatcher();

        info!(appointment_id = %appointment.id, "appointment scheduled");
        Ok(appointment)
    }

    #[instrument(name = "appointments.service.list", skip(self, statuses), fields(patient_id = %patient_id))]
    pub async fn list(
        &self,
        patient_id: Uuid,
        statuses: &[AppointmentStatus],
        page: PageRequest,
    ) -> Result<(Vec<Appointment>, Pagination), DomainError> {
        let (items, total) = self
            .repo
            .list_for_patient(patient_id, statuses, page.offset(), page.limit)
            .await
            .map_err(DomainError::database)?;
        debug!(returned = items.len(), total, "appointments listed");
        Ok((items, Pagination::new(page.page, page.limit, total)))
    }

    /// Not found unless the appointment belongs to `patient_id`.
    #[instrument(
        name = "appointments.service.get",
        skip(self),
        fields(patient_id = %patient_id, appointment_id = %id)
    )]
    pub async fn get(&self, patient_id: Uuid, id: Uuid) -> Result<Appointment, DomainError> {
        self.owned(patient_id, id).await
    }

    #[instrument(name = "appointments.service.get_any", skip(self), fields(appointment_id = %id))]
    pub async fn get_any(&self, id: Uuid) -> Result<Appointment, DomainError> {
        self.repo
            .find(id)
            .await
            .map_err(DomainError::database)?
            .ok_or_else(|| DomainError::not_found(id))
    }

    #[instrument(
        name = "appointments.service.update",
        skip(self, patch),
        fields(patient_id = %patient_id, appointment_id = %id)
    )]
    pub async fn update(
        &self,
        patient_id: Uuid,
        id: Uuid,
        patch: AppointmentPatch,
    ) -> Result<Appointment, DomainError> {
        let current = self.owned(patient_id, id).await?;
        if current.status.is_terminal() {
            return Err(DomainError::NotModifiable {
                status: current.status,
            });
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let now = Utc::now();
        let mut next = current;
        if let Some(date) = patch.appointment_date {
            if date < now {
                return Err(DomainError::DateInPast);
            }
            if date != next.appointment_date {
                // A moved appointment gets a fresh reminder.
                next.reminded_at = None;
            }
            next.appointment_date = date;
        }
        if let Some(doctor) = patch.doctor {
            next.doctor = doctor;
        }
        if let Some(specialty) = patch.specialty {
            next.specialty = specialty;
        }
        if let Some(time) = patch.appointment_time {
            next.appointment_time = time;
        }
        if let Some(hospital) = patch.hospital_name {
            next.hospital_name = Some(hospital);
        }
        if let Some(notes) = patch.notes {
            next.notes = Some(notes);
        }
        next.updated_at = now;

        let note = Self::note(
            &next,
            NotificationKind::AppointmentConfirmed,
            "Appointment Updated",
            "Your appointment has been updated successfully.".to_string(),
        );
        self.transition(&next, note).await?;
        info!("appointment updated");
        Ok(next)
    }

    #[instrument(
        name = "appointments.service.cancel",
        skip(self),
        fields(patient_id = %patient_id, appointment_id = %id)
    )]
    pub async fn cancel(&self, patient_id: Uuid, id: Uuid) -> Result<Appointment, DomainError> {
        let mut next = self.owned(patient_id, id).await?;
        match next.status {
            AppointmentStatus::Cancelled => return Err(DomainError::AlreadyCancelled),
            AppointmentStatus::Completed => return Err(DomainError::CancelCompleted),
            AppointmentStatus::Scheduled => {}
        }
        next.status = AppointmentStatus::Cancelled;
        next.updated_at = Utc::now();

        let note = Self::note(
            &next,
            NotificationKind::AppointmentCancelled,
            "Appointment Cancelled",
            format!("Your appointment with {} has been cancelled.", next.doctor),
        );
        self.transition(&next, note).await?;
        info!("appointment cancelled");
        Ok(next)
    }

    /// Staff action; any scheduled appointment can be completed.
    #[instrument(
        name = "appointments.service.complete",
        skip(self),
        fields(staff_id = %staff_id, appointment_id = %id)
    )]
    pub async fn complete(&self, staff_id: Uuid, id: Uuid) -> Result<Appointment, DomainError> {
        let mut next = self.get_any(id).await?;
        if next.status.is_terminal() {
            return Err(DomainError::NotCompletable {
                status: next.status,
            });
        }
        next.status = AppointmentStatus::Completed;
        next.updated_at = Utc::now();

        let note = Self::note(
            &next,
            NotificationKind::AppointmentCompleted,
            "Appointment Completed",
            format!(
                "Your appointment with {} has been marked as completed.",
                next.doctor
            ),
        );
        self.transition(&next, note).await?;
        info!("appointment completed");
        Ok(next)
    }

    /// Stages one reminder per scheduled appointment dated within `lead` of
    /// `now`. Returns how many reminders were staged.
    #[instrument(name = "appointments.service.send_due_reminders", skip(self))]
    pub async fn send_due_reminders(
        &self,
        now: DateTime<Utc>,
        lead: chrono::Duration,
        limit: u64,
    ) -> Result<usize, DomainError> {
        let until = now.checked_add_signed(lead).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let due = self
            .repo
            .due_for_reminder(now, until, limit)
            .await
            .map_err(DomainError::database)?;

        let mut sent = 0;
        for appointment in &due {
            let note = Self::note(
                appointment,
                NotificationKind::AppointmentReminder,
                "Appointment Reminder",
                format!(
                    "Reminder: your appointment with {} is on {} at {}.",
                    appointment.doctor,
                    display_date(&appointment.appointment_date),
                    appointment.appointment_time
                ),
            );
            if self
                .repo
                .mark_reminded(appointment.id, now, note)
                .await
                .map_err(DomainError::database)?
            {
                sent += 1;
            }
        }
        if sent > 0 {
            self.notifications.wake_dispatcher();
            info!(sent, "appointment reminders staged");
        }
        Ok(sent)
    }
}
