mod common;

use std::sync::Arc;

use common::{join_req, staged, Profiles, WakeCounter, HOSPITAL};
use modkit::api::PageRequest;
use queues::client::QueuesApi;
use queues::domain::error::DomainError;
use queues::gateways::local::QueuesLocalClient;
use queues::model::QueueStatus;
use uuid::Uuid;

#[tokio::test]
async fn joins_append_to_their_own_partition() {
    let db = common::setup_db().await;
    let wakes = Arc::new(WakeCounter::default());
    let svc = common::service(&db, Profiles::default(), wakes.clone());

    let first = svc.join(Uuid::new_v4(), join_req("Cardiology")).await.unwrap();
    let second = svc.join(Uuid::new_v4(), join_req("Cardiology")).await.unwrap();
    let other = svc.join(Uuid::new_v4(), join_req("dermatology")).await.unwrap();

    assert_eq!((first.position, first.queue_number.as_str()), (1, "C-001"));
    assert_eq!(first.estimated_wait_time, 0);
    assert_eq!((second.position, second.queue_number.as_str()), (2, "C-002"));
    assert_eq!(second.estimated_wait_time, 15);
    assert_eq!((other.position, other.queue_number.as_str()), (1, "D-001"));

    let rows = staged(&db).await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].kind, "queue_update");
    assert_eq!(
        rows[1].message,
        "You have joined the Cardiology queue at General Hospital. Your queue number is C-002."
    );
    assert_eq!(rows[1].related_id, Some(second.id));
    assert_eq!(wakes.count(), 3);
}

#[tokio::test]
async fn a_patient_holds_one_active_entry() {
    let db = common::setup_db().await;
    let wakes = Arc::new(WakeCounter::default());
    let svc = common::service(&db, Profiles::default(), wakes.clone());
    let patient = Uuid::new_v4();

    let entry = svc.join(patient, join_req("Cardiology")).await.unwrap();
    for specialty in ["Cardiology", "Dermatology"] {
        match svc.join(patient, join_req(specialty)).await {
            Err(DomainError::AlreadyInQueue { existing }) => assert_eq!(existing.id, entry.id),
            other => panic!("expected AlreadyInQueue, got {other:?}"),
        }
    }
    assert_eq!(staged(&db).await.len(), 1);
    assert_eq!(wakes.count(), 1);

    svc.leave(patient).await.unwrap();
    let again = svc.join(patient, join_req("Cardiology")).await.unwrap();
    assert_eq!(again.position, 1);
    assert_ne!(again.id, entry.id);
}

#[tokio::test]
async fn leaving_closes_the_gap_in_the_partition_only() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));
    let (p1, p2, p3, d1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    for p in [p1, p2, p3] {
        svc.join(p, join_req("Cardiology")).await.unwrap();
    }
    svc.join(d1, join_req("Dermatology")).await.unwrap();
    let d2 = Uuid::new_v4();
    svc.join(d2, join_req("Dermatology")).await.unwrap();

    let left = svc.leave(p2).await.unwrap();
    assert_eq!(left.status, QueueStatus::Cancelled);
    assert!(left.cancelled_at.is_some());

    let (e1, _) = svc.status(p1).await.unwrap();
    let (e3, stats) = svc.status(p3).await.unwrap();
    assert_eq!(e1.position, 1);
    assert_eq!(e3.position, 2);
    assert_eq!(stats.total_in_queue, 2);
    assert_eq!(stats.ahead_in_queue, 1);
    assert_eq!(stats.estimated_wait_time, 15);

    let (untouched, _) = svc.status(d2).await.unwrap();
    assert_eq!(untouched.position, 2);

    let last = staged(&db).await.pop().unwrap();
    assert_eq!(last.title, "Left Queue");
    assert_eq!(last.message, "You have left the Cardiology queue at General Hospital.");

    assert!(matches!(svc.leave(p2).await, Err(DomainError::NotInQueue)));
    assert!(matches!(svc.status(p2).await, Err(DomainError::NotInQueue)));
}

#[tokio::test]
async fn status_persists_the_recomputed_wait() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));
    let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    for p in [p1, p2, p3] {
        svc.join(p, join_req("Cardiology")).await.unwrap();
    }
    let client = QueuesLocalClient::new(svc.clone());
    assert_eq!(
        client.active_entry(p3).await.unwrap().unwrap().estimated_wait_time,
        30
    );

    svc.leave(p1).await.unwrap();
    let (entry, stats) = svc.status(p3).await.unwrap();
    assert_eq!(entry.estimated_wait_time, 15);
    assert_eq!(stats.ahead_in_queue, 1);

    let stored = client.active_entry(p3).await.unwrap().unwrap();
    assert_eq!(stored.estimated_wait_time, 15);
    assert!(client.active_entry(p1).await.unwrap().is_none());
}

#[tokio::test]
async fn call_next_is_first_come_first_served() {
    let db = common::setup_db().await;
    let wakes = Arc::new(WakeCounter::default());
    let svc = common::service(&db, Profiles::default(), wakes.clone());
    let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    for p in [p1, p2, p3] {
        svc.join(p, join_req("Cardiology")).await.unwrap();
    }
    let staff = Uuid::new_v4();

    let called = svc.call_next(staff, HOSPITAL, "Cardiology").await.unwrap();
    assert_eq!(called.patient_id, p1);
    assert_eq!(called.status, QueueStatus::Called);
    assert!(called.called_at.is_some());

    let (e2, stats) = svc.status(p2).await.unwrap();
    assert_eq!(e2.position, 1);
    assert_eq!(stats.ahead_in_queue, 0);
    assert_eq!(stats.estimated_wait_time, 0);

    let (at_desk, desk_stats) = svc.status(p1).await.unwrap();
    assert_eq!(at_desk.status, QueueStatus::Called);
    assert_eq!(desk_stats.ahead_in_queue, 0);
    assert_eq!(desk_stats.total_in_queue, 2);

    let note = staged(&db).await.pop().unwrap();
    assert_eq!(note.user_id, p1);
    assert_eq!(note.title, "You're Next!");
    assert_eq!(note.priority, "urgent");

    let next = svc.call_next(staff, HOSPITAL, "Cardiology").await.unwrap();
    assert_eq!(next.patient_id, p2);
    let (e3, _) = svc.status(p3).await.unwrap();
    assert_eq!(e3.position, 1);
    assert_eq!(wakes.count(), 5);
}

#[tokio::test]
async fn call_next_on_an_empty_partition_is_an_error() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));
    svc.join(Uuid::new_v4(), join_req("Cardiology")).await.unwrap();

    let err = svc
        .call_next(Uuid::new_v4(), HOSPITAL, "Dermatology")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NoPatientsWaiting { .. }));
    let err = svc
        .call_next(Uuid::new_v4(), "City Clinic", "Cardiology")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NoPatientsWaiting { .. }));
}

#[tokio::test]
async fn a_called_patient_leaving_moves_nobody() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));
    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    svc.join(p1, join_req("Cardiology")).await.unwrap();
    svc.join(p2, join_req("Cardiology")).await.unwrap();
    svc.call_next(Uuid::new_v4(), HOSPITAL, "Cardiology")
        .await
        .unwrap();

    let left = svc.leave(p1).await.unwrap();
    assert_eq!(left.status, QueueStatus::Cancelled);
    let (e2, _) = svc.status(p2).await.unwrap();
    assert_eq!(e2.position, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_get_distinct_positions() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = common::setup_file_db(&dir).await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));

    let handles: Vec<_> = (0..30)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.join(Uuid::new_v4(), join_req("Cardiology")).await })
        })
        .collect();
    let mut positions = Vec::new();
    for h in handles {
        positions.push(h.await.unwrap().unwrap().position);
    }
    positions.sort_unstable();
    assert_eq!(positions, (1..=30).collect::<Vec<u32>>());
}

#[tokio::test]
async fn staff_listing_and_board_resolve_patients() {
    let db = common::setup_db().await;
    let (known, gone) = (Uuid::new_v4(), Uuid::new_v4());
    let svc = common::service(
        &db,
        Profiles::with(&[(known, "Amara", "Okafor")]),
        Arc::new(WakeCounter::default()),
    );
    svc.join(known, join_req("Cardiology")).await.unwrap();
    svc.join(gone, join_req("Cardiology")).await.unwrap();
    svc.join(Uuid::new_v4(), join_req("Dermatology")).await.unwrap();

    let rows = svc.hospital_queue(HOSPITAL, Some("Cardiology")).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0.position, 1);
    assert_eq!(rows[0].1.as_ref().unwrap().email, "amara@example.com");
    assert!(rows[1].1.is_none());
    assert_eq!(svc.hospital_queue(HOSPITAL, None).await.unwrap().len(), 3);

    svc.call_next(Uuid::new_v4(), HOSPITAL, "Cardiology")
        .await
        .unwrap();
    let board = svc.board(Some(HOSPITAL), Some("Cardiology")).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].0.status, QueueStatus::Called);
    assert_eq!(board[0].1, "Amara Okafor");
    assert_eq!(board[1].1, "Unknown");
    assert!(svc.board(Some("City Clinic"), None).await.unwrap().is_empty());

    assert_eq!(svc.dump().await.unwrap().len(), 3);
}

#[tokio::test]
async fn history_is_newest_first_and_paginated() {
    let db = common::setup_db().await;
    let svc = common::service(&db, Profiles::default(), Arc::new(WakeCounter::default()));
    let patient = Uuid::new_v4();
    for specialty in ["Cardiology", "Dermatology", "Orthopedics"] {
        svc.join(patient, join_req(specialty)).await.unwrap();
        svc.leave(patient).await.unwrap();
    }

    let (page, pagination) = svc
        .history(patient, PageRequest::clamp(Some(1), Some(2), 10, 100))
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].specialty, "Orthopedics");
    assert_eq!(pagination.total, 3);
    assert_eq!(pagination.pages, 2);

    let (rest, _) = svc
        .history(patient, PageRequest::clamp(Some(2), Some(2), 10, 100))
        .await
        .unwrap();
    assert_eq!(rest[0].specialty, "Cardiology");
}
