mod common;

use std::sync::Arc;

use appointments::client::AppointmentsApi;
use appointments::domain::error::DomainError;
use appointments::domain::model::AppointmentPatch;
use appointments::gateways::local::AppointmentsLocalClient;
use appointments::model::AppointmentStatus;
use chrono::{Duration, Utc};
use common::WakeCounter;
use modkit::api::PageRequest;
use uuid::Uuid;

fn page() -> PageRequest {
    PageRequest::clamp(None, None, 10, 100)
}

#[tokio::test]
async fn booking_stages_a_confirmation() {
    let db = common::setup_db().await;
    let wakes = Arc::new(WakeCounter::default());
    let svc = common::service(&db, wakes.clone());
    let patient = Uuid::new_v4();

    let appt = svc
        .create(patient, common::booking(Utc::now() + Duration::days(3)))
        .await
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::Scheduled);
    assert_eq!(appt.patient_id, patient);

    let staged = common::staged(&db).await;
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].user_id, patient);
    assert_eq!(staged[0].title, "Appointment Scheduled");
    assert_eq!(staged[0].kind, "appointment_confirmed");
    assert_eq!(staged[0].related_id, Some(appt.id));
    assert!(staged[0].message.contains("Dr. Bello"));
    assert!(staged[0].message.contains("10:30 AM"));
    assert_eq!(wakes.count(), 1);
}

#[tokio::test]
async fn past_dates_are_rejected_without_side_effects() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();

    let err = svc
        .create(patient, common::booking(Utc::now() - Duration::hours(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DateInPast));

    let (items, pagination) = svc.list(patient, &[], page()).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(pagination.total, 0);
    assert!(common::staged(&db).await.is_empty());
}

#[tokio::test]
async fn listing_sorts_by_date_and_filters_by_status() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();
    let now = Utc::now();

    let late = svc.create(patient, common::booking(now + Duration::days(9))).await.unwrap();
    let early = svc.create(patient, common::booking(now + Duration::days(2))).await.unwrap();
    let middle = svc.create(patient, common::booking(now + Duration::days(5))).await.unwrap();
    svc.create(Uuid::new_v4(), common::booking(now + Duration::days(1)))
        .await
        .unwrap();
    svc.cancel(patient, middle.id).await.unwrap();

    let (items, pagination) = svc.list(patient, &[], page()).await.unwrap();
    let ids: Vec<_> = items.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![early.id, middle.id, late.id]);
    assert_eq!(pagination.total, 3);

    let (scheduled, _) = svc
        .list(patient, &[AppointmentStatus::Scheduled], page())
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 2);

    let (page2, pagination) = svc
        .list(patient, &[], PageRequest::clamp(Some(2), Some(2), 10, 100))
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].id, late.id);
    assert_eq!(pagination.pages, 2);
}

#[tokio::test]
async fn other_patients_cannot_see_or_touch_an_appointment() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let appt = svc
        .create(owner, common::booking(Utc::now() + Duration::days(3)))
        .await
        .unwrap();

    assert!(matches!(
        svc.get(stranger, appt.id).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        svc.cancel(stranger, appt.id).await,
        Err(DomainError::NotFound { .. })
    ));
    assert_eq!(svc.get(owner, appt.id).await.unwrap().id, appt.id);
}

#[tokio::test]
async fn updates_apply_only_to_scheduled_appointments() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();
    let appt = svc
        .create(patient, common::booking(Utc::now() + Duration::days(3)))
        .await
        .unwrap();

    let new_date = Utc::now() + Duration::days(4);
    let updated = svc
        .update(
            patient,
            appt.id,
            AppointmentPatch {
                doctor: Some("Dr. Musa".into()),
                appointment_date: Some(new_date),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.doctor, "Dr. Musa");
    assert_eq!(updated.specialty, "Cardiology");
    assert_eq!(svc.get(patient, appt.id).await.unwrap().doctor, "Dr. Musa");
    assert!(common::staged(&db)
        .await
        .iter()
        .any(|n| n.title == "Appointment Updated"));

    let past = svc
        .update(
            patient,
            appt.id,
            AppointmentPatch {
                appointment_date: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(past, Err(DomainError::DateInPast)));

    svc.cancel(patient, appt.id).await.unwrap();
    let after_cancel = svc
        .update(
            patient,
            appt.id,
            AppointmentPatch {
                notes: Some("late".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        after_cancel,
        Err(DomainError::NotModifiable {
            status: AppointmentStatus::Cancelled
        })
    ));
}

#[tokio::test]
async fn cancellation_rules() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();
    let staff = Uuid::new_v4();
    let date = Utc::now() + Duration::days(3);

    let a = svc.create(patient, common::booking(date)).await.unwrap();
    let cancelled = svc.cancel(patient, a.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(matches!(
        svc.cancel(patient, a.id).await,
        Err(DomainError::AlreadyCancelled)
    ));

    let b = svc.create(patient, common::booking(date)).await.unwrap();
    svc.complete(staff, b.id).await.unwrap();
    assert!(matches!(
        svc.cancel(patient, b.id).await,
        Err(DomainError::CancelCompleted)
    ));

    let kinds: Vec<_> = common::staged(&db).await.into_iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds.iter().filter(|k| *k == "appointment_cancelled").count(),
        1
    );
    assert_eq!(
        kinds.iter().filter(|k| *k == "appointment_completed").count(),
        1
    );
}

#[tokio::test]
async fn completion_is_terminal() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();
    let staff = Uuid::new_v4();
    let a = svc
        .create(patient, common::booking(Utc::now() + Duration::days(1)))
        .await
        .unwrap();

    let done = svc.complete(staff, a.id).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);
    assert!(matches!(
        svc.complete(staff, a.id).await,
        Err(DomainError::NotCompletable {
            status: AppointmentStatus::Completed
        })
    ));
    assert!(matches!(
        svc.complete(staff, Uuid::new_v4()).await,
        Err(DomainError::NotFound { .. })
    ));

    let note = common::staged(&db)
        .await
        .into_iter()
        .find(|n| n.kind == "appointment_completed")
        .unwrap();
    assert_eq!(note.user_id, patient);
}

#[tokio::test]
async fn reminders_go_out_once_per_appointment() {
    let db = common::setup_db().await;
    let wakes = Arc::new(WakeCounter::default());
    let svc = common::service(&db, wakes.clone());
    let patient = Uuid::new_v4();
    let now = Utc::now();

    let soon = svc
        .create(patient, common::booking(now + Duration::hours(2)))
        .await
        .unwrap();
    let later = svc
        .create(patient, common::booking(now + Duration::days(3)))
        .await
        .unwrap();
    let cancelled = svc
        .create(patient, common::booking(now + Duration::hours(3)))
        .await
        .unwrap();
    svc.cancel(patient, cancelled.id).await.unwrap();

    let sent = svc
        .send_due_reminders(Utc::now(), Duration::hours(24), 100)
        .await
        .unwrap();
    assert_eq!(sent, 1);
    let reminders: Vec<_> = common::staged(&db)
        .await
        .into_iter()
        .filter(|n| n.kind == "appointment_reminder")
        .collect();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].related_id, Some(soon.id));
    assert!(svc.get(patient, soon.id).await.unwrap().reminded_at.is_some());

    let again = svc
        .send_due_reminders(Utc::now(), Duration::hours(24), 100)
        .await
        .unwrap();
    assert_eq!(again, 0);

    // Moving the later appointment into the window makes it due.
    svc.update(
        patient,
        later.id,
        AppointmentPatch {
            appointment_date: Some(Utc::now() + Duration::hours(5)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let moved = svc
        .send_due_reminders(Utc::now(), Duration::hours(24), 100)
        .await
        .unwrap();
    assert_eq!(moved, 1);
}

#[tokio::test]
async fn local_client_reads_any_appointment() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Arc::new(WakeCounter::default()));
    let a = svc
        .create(Uuid::new_v4(), common::booking(Utc::now() + Duration::days(2)))
        .await
        .unwrap();

    let client = AppointmentsLocalClient::new(svc);
    let fetched = client.get_appointment(a.id).await.unwrap();
    assert_eq!((fetched.id, fetched.patient_id), (a.id, a.patient_id));
    assert_eq!(fetched.patient_info, a.patient_info);
    let missing = Uuid::new_v4();
    assert_eq!(
        client.get_appointment(missing).await,
        Err(appointments::error::AppointmentsError::NotFound { id: missing })
    );
}
