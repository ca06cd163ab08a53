//! Integration tests for the SQLite appointment store
//!
//! **Coverage:**
//! - `AppointmentService` against the real schema: create, partial update,
//!   status stamps, cancel, delete
//! - Foreign key and check constraints surfacing as typed errors
//! - List filters, ordering and the row limit
//! - Compare-and-swap of the external calendar link

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use careline_core::{AppointmentService, AppointmentStore, SyncDispatcher};
use careline_domain::{
    AppointmentFilter, AppointmentPatch, AppointmentStatus, AppointmentUpdate, CarelineError,
    NewAppointment, StatusChange, SyncJob,
};
use parking_lot::Mutex;
use support::{at, Parties, TestDatabase};
use uuid::Uuid;

#[derive(Default)]
struct CollectingDispatcher {
    jobs: Mutex<Vec<SyncJob>>,
}

impl SyncDispatcher for CollectingDispatcher {
    fn dispatch(&self, job: SyncJob) {
        self.jobs.lock().push(job);
    }
}

struct Fixture {
    db: TestDatabase,
    parties: Parties,
    dispatcher: Arc<CollectingDispatcher>,
    service: AppointmentService,
}

async fn fixture() -> Fixture {
    let db = TestDatabase::new();
    let parties = Parties::seed(&db.directory()).await;
    let dispatcher = Arc::new(CollectingDispatcher::default());
    let service = AppointmentService::new(db.store(), dispatcher.clone());
    Fixture { db, parties, dispatcher, service }
}

// ============================================================================
// Lifecycle against SQLite
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn created_appointment_round_trips_through_sqlite() {
    let f = fixture().await;

    let created = f
        .service
        .create(f.parties.booking(at(2024, 1, 15, 9, 0)).with_notes("  first visit  "))
        .await
        .expect("create succeeds");

    let loaded = f.service.get(created.id).await.expect("get succeeds");
    assert_eq!(loaded, created);
    assert_eq!(loaded.status, AppointmentStatus::Scheduled);
    assert_eq!(loaded.notes.as_deref(), Some("first visit"));
    assert_eq!(f.dispatcher.jobs.lock().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_patient_violates_foreign_key() {
    let f = fixture().await;
    let input = NewAppointment::new(
        f.parties.clinic_id,
        Uuid::new_v4(),
        f.parties.professional_id,
        at(2024, 1, 15, 9, 0),
        30,
    );

    let err = f.service.create(input).await.unwrap_err();

    assert_eq!(err, CarelineError::Database("foreign key constraint violation".into()));
    assert!(f.dispatcher.jobs.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_update_and_clearing_optional_fields() {
    let f = fixture().await;
    let created = f
        .service
        .create(f.parties.booking(at(2024, 1, 15, 9, 0)).with_notes("x-ray"))
        .await
        .unwrap();

    let update = AppointmentUpdate {
        duration_minutes: Some(90),
        notes: Some(None),
        ..Default::default()
    };
    let updated = f.service.update(created.id, update).await.unwrap();

    assert_eq!(updated.duration_minutes, 90);
    assert_eq!(updated.notes, None);
    assert_eq!(updated.treatment_id, Some(f.parties.treatment_id));
    assert_eq!(updated.scheduled_at, created.scheduled_at);
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test(flavor = "multi_thread")]
async fn check_constraint_backs_up_validation() {
    let f = fixture().await;
    let store = f.db.store();
    let created = f.service.create(f.parties.booking(at(2024, 1, 15, 9, 0))).await.unwrap();

    let patch = AppointmentPatch { duration_minutes: Some(0), ..Default::default() };
    let err = store.update_fields(created.id, &patch).await.unwrap_err();

    assert!(matches!(err, CarelineError::Database(msg) if msg.starts_with("check constraint")));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_flow_persists_stamps_and_reason() {
    let f = fixture().await;
    let created = f.service.create(f.parties.booking(at(2024, 1, 15, 9, 0))).await.unwrap();
    let receptionist = Uuid::new_v4();

    let confirmed = f
        .service
        .change_status(created.id, StatusChange::new(AppointmentStatus::Confirmed).by(receptionist))
        .await
        .unwrap();
    let cancelled = f.service.cancel(created.id, Some("patient request".into())).await.unwrap();

    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(confirmed.status_changed_by, Some(receptionist));
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("patient request"));
    assert_eq!(cancelled.confirmed_at, confirmed.confirmed_at);

    let reloaded = f.service.get(created.id).await.unwrap();
    assert_eq!(reloaded, cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_removes_row() {
    let f = fixture().await;
    let created = f.service.create(f.parties.booking(at(2024, 1, 15, 9, 0))).await.unwrap();

    f.service.delete(created.id).await.unwrap();

    assert!(matches!(f.service.get(created.id).await, Err(CarelineError::NotFound(_))));
    assert!(matches!(f.service.delete(created.id).await, Err(CarelineError::NotFound(_))));
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn list_applies_filters_order_and_limit() {
    let f = fixture().await;
    let directory = f.db.directory();
    let other = f.parties.add_professional(&directory, "Dr. Bruno").await;

    for hour in [15, 9, 12] {
        f.service.create(f.parties.booking(at(2024, 1, 15, hour, 0))).await.unwrap();
    }
    let mut elsewhere = f.parties.booking(at(2024, 1, 15, 10, 0));
    elsewhere.professional_id = other;
    f.service.create(elsewhere).await.unwrap();
    f.service.create(f.parties.booking(at(2024, 1, 16, 9, 0))).await.unwrap();

    let day = AppointmentFilter::between(at(2024, 1, 15, 0, 0), at(2024, 1, 15, 23, 59));
    let mine = f.service.list(&day.clone().for_professional(f.parties.professional_id)).await.unwrap();
    let hours: Vec<_> = mine.iter().map(|a| a.scheduled_at).collect();
    assert_eq!(hours, vec![at(2024, 1, 15, 9, 0), at(2024, 1, 15, 12, 0), at(2024, 1, 15, 15, 0)]);

    let limited = AppointmentFilter { limit: Some(2), ..day.clone() };
    assert_eq!(f.service.list(&limited).await.unwrap().len(), 2);

    let inclusive = AppointmentFilter::between(at(2024, 1, 15, 9, 0), at(2024, 1, 15, 9, 0));
    assert_eq!(f.service.list(&inclusive).await.unwrap().len(), 1);

    let scheduled = day.with_status(AppointmentStatus::Cancelled);
    assert!(f.service.list(&scheduled).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn event_link_swap_is_conditional() {
    let f = fixture().await;
    let store = f.db.store();
    let created = f.service.create(f.parties.booking(at(2024, 1, 15, 9, 0))).await.unwrap();

    let owner = f.parties.professional_id;

    assert!(store.swap_external_event_id(created.id, None, Some(("ev_123", owner))).await.unwrap());
    assert!(!store.swap_external_event_id(created.id, None, Some(("ev_456", owner))).await.unwrap());
    assert!(!store
        .swap_external_event_id(Uuid::new_v4(), None, Some(("ev_789", owner)))
        .await
        .unwrap());

    let linked = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(linked.external_calendar_event_id.as_deref(), Some("ev_123"));
    assert_eq!(linked.external_calendar_owner_id, Some(owner));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_status_changes_cannot_both_land() {
    let f = fixture().await;
    let created = f.service.create(f.parties.booking(at(2024, 1, 15, 9, 0))).await.unwrap();
    f.service.change_status(created.id, StatusChange::new(AppointmentStatus::InProgress)).await.unwrap();

    let (complete, cancel) = tokio::join!(
        f.service.change_status(created.id, StatusChange::new(AppointmentStatus::Completed)),
        f.service.cancel(created.id, Some("left early".into())),
    );

    // Whichever lands second sees the other's terminal status.
    assert!(complete.is_ok() != cancel.is_ok(), "{complete:?} / {cancel:?}");
    let stored = f.service.get(created.id).await.unwrap();
    match (complete, cancel) {
        (Ok(done), Err(err)) => {
            assert_eq!(stored.status, AppointmentStatus::Completed);
            assert_eq!(stored, done);
            assert!(matches!(err, CarelineError::InvalidTransition { .. }));
        }
        (Err(err), Ok(cancelled)) => {
            assert_eq!(stored.status, AppointmentStatus::Cancelled);
            assert_eq!(stored, cancelled);
            assert!(matches!(err, CarelineError::InvalidTransition { .. }));
        }
        other => panic!("exactly one change must win, got {other:?}"),
    }
}
