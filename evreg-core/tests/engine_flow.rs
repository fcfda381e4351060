//! End-to-end engine scenarios over the in-memory store with a pinned clock.

use evreg_core::admission::AdmissionController;
use evreg_core::clock::FixedClock;
use evreg_core::entities::{
    AttendanceStatus, Credential, Event, LifecycleState, OriginMetadata, RegistrationStatus,
};
use evreg_core::error::{EngineError, WindowReason};
use evreg_core::history::HistoryReader;
use evreg_core::issuer::{OsRngCredentials, TokenIssuer};
use evreg_core::lifecycle::LifecycleScheduler;
use evreg_core::notify::NoopNotifier;
use evreg_core::redemption::RedemptionService;
use evreg_core::store::{EngineStore, MemoryStore};
use std::sync::Arc;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

struct Engine {
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
    admission: Arc<AdmissionController>,
    redemption: RedemptionService,
    scheduler: LifecycleScheduler,
    history: HistoryReader,
}

fn engine_at(now: OffsetDateTime) -> Engine {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(now));
    let dyn_store: Arc<dyn EngineStore> = store.clone();
    let dyn_clock: Arc<evreg_core::clock::FixedClock> = clock.clone();

    let issuer = || {
        TokenIssuer::new(
            dyn_store.clone(),
            dyn_clock.clone(),
            Arc::new(OsRngCredentials),
        )
    };

    Engine {
        admission: Arc::new(AdmissionController::new(
            dyn_store.clone(),
            dyn_clock.clone(),
            issuer(),
            Arc::new(NoopNotifier),
        )),
        redemption: RedemptionService::new(dyn_store.clone(), dyn_clock.clone()),
        scheduler: LifecycleScheduler::new(dyn_store.clone(), dyn_clock.clone(), issuer()),
        history: HistoryReader::new(dyn_store.clone()),
        store,
        clock,
    }
}

fn published_event(start: OffsetDateTime, capacity: Option<i32>) -> Event {
    Event {
        id: Uuid::new_v4(),
        title: "Rust Conf".to_owned(),
        start_at: start,
        end_at: None,
        capacity,
        lifecycle: LifecycleState::Published,
        created_at: start - Duration::days(30),
    }
}

async fn seed(engine: &Engine, event: &Event) {
    engine.store.insert_event(event).await.unwrap();
}

// --- Admission -------------------------------------------------------------

#[tokio::test]
async fn happy_path_admission_issues_token_with_thirty_day_expiry() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), Some(1));
    seed(&engine, &event).await;

    let a = Uuid::new_v4();
    let admission = engine.admission.admit(event.id, a).await.unwrap();
    assert_eq!(admission.registration.status, RegistrationStatus::Approved);
    assert_eq!(
        admission.token.expires_at,
        datetime!(2025-02-09 08:00 UTC)
    );
    assert!(admission.notice_warning.is_none());

    // Capacity 1: the next participant is turned away.
    engine.clock.set(datetime!(2025-01-10 08:01 UTC));
    let b = Uuid::new_v4();
    let err = engine.admission.admit(event.id, b).await.unwrap_err();
    assert!(matches!(err, EngineError::EventFull));
}

#[tokio::test]
async fn admission_rejected_inside_one_hour_buffer() {
    let engine = engine_at(datetime!(2025-01-10 09:05 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), Some(10));
    seed(&engine, &event).await;

    let err = engine
        .admission
        .admit(event.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RegistrationClosed));
}

#[tokio::test]
async fn duplicate_admission_rejected() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    let participant = Uuid::new_v4();
    engine.admission.admit(event.id, participant).await.unwrap();
    let err = engine
        .admission
        .admit(event.id, participant)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRegistered));
}

#[tokio::test]
async fn draft_and_archived_events_are_unavailable() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let mut event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    event.lifecycle = LifecycleState::Draft;
    seed(&engine, &event).await;

    let err = engine
        .admission
        .admit(event.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::EventUnavailable));

    let missing = engine
        .admission
        .admit(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(missing, EngineError::EventUnavailable));
}

#[tokio::test]
async fn concurrent_admissions_never_oversell_capacity() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), Some(3));
    seed(&engine, &event).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let admission = engine.admission.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            admission.admit(event_id, Uuid::new_v4()).await
        }));
    }

    let mut admitted = 0;
    let mut full = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EngineError::EventFull) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 3);
    assert_eq!(full, 17);

    let roster = engine.history.event_history(event.id).await.unwrap();
    assert_eq!(roster.len(), 3);
}

// --- Verification and redemption -------------------------------------------

#[tokio::test]
async fn verification_respects_the_attendance_window() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), Some(1));
    seed(&engine, &event).await;

    let admission = engine
        .admission
        .admit(event.id, Uuid::new_v4())
        .await
        .unwrap();
    let credential = admission.token.credential;

    // 40 minutes before start: too early, and the caller is told so.
    engine.clock.set(datetime!(2025-01-10 09:20 UTC));
    let err = engine
        .redemption
        .verify(credential, event.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::OutsideAttendanceWindow {
            reason: WindowReason::TooEarly
        }
    ));

    // Day before: wrong day.
    engine.clock.set(datetime!(2025-01-09 10:00 UTC));
    let err = engine
        .redemption
        .verify(credential, event.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::OutsideAttendanceWindow {
            reason: WindowReason::WrongDay
        }
    ));

    // 29 minutes before start: open.
    engine.clock.set(datetime!(2025-01-10 09:31 UTC));
    let info = engine
        .redemption
        .verify(credential, event.id)
        .await
        .unwrap();
    assert_eq!(info.registration_id, admission.registration.id);

    // Late the same day: still open.
    engine.clock.set(datetime!(2025-01-10 12:00 UTC));
    assert!(engine.redemption.verify(credential, event.id).await.is_ok());
}

#[tokio::test]
async fn redemption_marks_present_and_is_single_use() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    let participant = Uuid::new_v4();
    let admission = engine.admission.admit(event.id, participant).await.unwrap();
    let credential = admission.token.credential;

    engine.clock.set(datetime!(2025-01-10 10:05 UTC));
    let origin = OriginMetadata {
        address: Some("203.0.113.9".to_owned()),
        client: Some("check-in kiosk".to_owned()),
    };
    let record = engine
        .redemption
        .redeem(credential, event.id, origin)
        .await
        .unwrap();
    assert_eq!(record.participant_id, participant);
    assert_eq!(record.origin_address.as_deref(), Some("203.0.113.9"));

    let history = engine.history.participant_history(participant).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].registration.attendance_status,
        AttendanceStatus::Present
    );
    assert_eq!(history[0].attendance_record_id, Some(record.id));

    // Second redemption fails with the uniform token error.
    let err = engine
        .redemption
        .redeem(credential, event.id, OriginMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn concurrent_redemptions_produce_exactly_one_record() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    let participant = Uuid::new_v4();
    let admission = engine.admission.admit(event.id, participant).await.unwrap();
    let credential = admission.token.credential;
    engine.clock.set(datetime!(2025-01-10 10:00 UTC));

    let redemption = Arc::new(RedemptionService::new(
        engine.store.clone() as Arc<dyn EngineStore>,
        engine.clock.clone(),
    ));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let redemption = redemption.clone();
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            redemption
                .redeem(credential, event_id, OriginMetadata::default())
                .await
        }));
    }

    let mut succeeded = 0;
    let mut uniform_failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InvalidOrExpiredToken) => uniform_failures += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(uniform_failures, 1);

    let history = engine.history.participant_history(participant).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].attendance_record_id.is_some());
}

#[tokio::test]
async fn token_failures_render_identically_regardless_of_cause() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    let other_event = published_event(datetime!(2025-01-10 11:00 UTC), None);
    seed(&engine, &event).await;
    seed(&engine, &other_event).await;

    let admission = engine
        .admission
        .admit(event.id, Uuid::new_v4())
        .await
        .unwrap();
    let credential = admission.token.credential;
    engine.clock.set(datetime!(2025-01-10 10:30 UTC));

    // Wrong event.
    let wrong_event = engine
        .redemption
        .verify(credential, other_event.id)
        .await
        .unwrap_err();
    // Unknown credential.
    let unknown = engine
        .redemption
        .verify(Credential::new(999_999_999_999).unwrap(), event.id)
        .await
        .unwrap_err();
    // Already redeemed.
    engine
        .redemption
        .redeem(credential, event.id, OriginMetadata::default())
        .await
        .unwrap();
    let spent = engine
        .redemption
        .verify(credential, event.id)
        .await
        .unwrap_err();

    for err in [&wrong_event, &unknown, &spent] {
        assert!(matches!(err, EngineError::InvalidOrExpiredToken));
    }
    assert_eq!(wrong_event.to_string(), unknown.to_string());
    assert_eq!(unknown.to_string(), spent.to_string());
}

// --- Lifecycle -------------------------------------------------------------

#[tokio::test]
async fn archival_sweep_is_idempotent_and_preserves_history() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let mut event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    event.end_at = Some(datetime!(2025-01-10 12:00 UTC));
    seed(&engine, &event).await;

    let participant = Uuid::new_v4();
    engine.admission.admit(event.id, participant).await.unwrap();

    engine.clock.set(datetime!(2025-01-11 00:00 UTC));
    let archived = engine.scheduler.archival_sweep().await.unwrap();
    assert_eq!(archived, vec![event.id]);

    let second = engine.scheduler.archival_sweep().await.unwrap();
    assert!(second.is_empty());

    let stored = engine.store.event(event.id).await.unwrap().unwrap();
    assert_eq!(stored.lifecycle, LifecycleState::Archived);

    // Registrations and tokens stay queryable through history.
    let history = engine.history.participant_history(participant).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event.lifecycle, LifecycleState::Archived);
    assert!(history[0].token.is_some());
}

#[tokio::test]
async fn events_without_end_archive_after_their_day() {
    let engine = engine_at(datetime!(2025-01-10 23:30 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    // Still the event's day: not archived yet.
    assert!(engine.scheduler.archival_sweep().await.unwrap().is_empty());

    engine.clock.set(datetime!(2025-01-11 00:00 UTC));
    let archived = engine.scheduler.archival_sweep().await.unwrap();
    assert_eq!(archived, vec![event.id]);
}

#[tokio::test]
async fn absence_sweep_marks_only_stale_rows_and_is_terminal() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    let attending = Uuid::new_v4();
    let absent = Uuid::new_v4();
    let att = engine.admission.admit(event.id, attending).await.unwrap();
    engine.admission.admit(event.id, absent).await.unwrap();

    engine.clock.set(datetime!(2025-01-10 10:10 UTC));
    engine
        .redemption
        .redeem(att.token.credential, event.id, OriginMetadata::default())
        .await
        .unwrap();

    // Same day: nothing is stale yet.
    assert_eq!(engine.scheduler.absence_sweep().await.unwrap(), 0);

    engine.clock.set(datetime!(2025-01-11 03:00 UTC));
    assert_eq!(engine.scheduler.absence_sweep().await.unwrap(), 1);
    // Idempotent: the second run claims nothing.
    assert_eq!(engine.scheduler.absence_sweep().await.unwrap(), 0);

    let history = engine.history.event_history(event.id).await.unwrap();
    let statuses: Vec<(Uuid, AttendanceStatus)> = history
        .iter()
        .map(|e| (e.registration.participant_id, e.registration.attendance_status))
        .collect();
    assert!(statuses.contains(&(attending, AttendanceStatus::Present)));
    assert!(statuses.contains(&(absent, AttendanceStatus::Absent)));
}

#[tokio::test]
async fn restore_flips_archived_back_and_rejects_other_edges() {
    let engine = engine_at(datetime!(2025-01-11 00:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    engine.scheduler.archival_sweep().await.unwrap();
    let restored = engine.scheduler.restore(event.id).await.unwrap();
    assert_eq!(restored.lifecycle, LifecycleState::Published);

    // Restoring a published event is not a legal edge.
    let err = engine.scheduler.restore(event.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: LifecycleState::Published,
            to: LifecycleState::Published,
        }
    ));

    let missing = engine.scheduler.restore(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, EngineError::EventUnavailable));
}

#[tokio::test]
async fn restore_does_not_resurrect_absence_facts() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-10 10:00 UTC), None);
    seed(&engine, &event).await;

    let participant = Uuid::new_v4();
    engine.admission.admit(event.id, participant).await.unwrap();

    engine.clock.set(datetime!(2025-01-11 02:00 UTC));
    engine.scheduler.archival_sweep().await.unwrap();
    engine.scheduler.absence_sweep().await.unwrap();
    engine.scheduler.restore(event.id).await.unwrap();

    let history = engine.history.participant_history(participant).await.unwrap();
    assert_eq!(
        history[0].registration.attendance_status,
        AttendanceStatus::Absent
    );
}

#[tokio::test]
async fn token_repair_sweep_reissues_lost_tokens() {
    let engine = engine_at(datetime!(2025-01-10 08:00 UTC));
    let event = published_event(datetime!(2025-01-12 10:00 UTC), None);
    seed(&engine, &event).await;

    // A registration committed without its token, as after a crash between
    // the admission transaction and issuance.
    let participant = Uuid::new_v4();
    let decision = engine
        .store
        .admit_registration(event.id, participant, datetime!(2025-01-10 08:00 UTC))
        .await
        .unwrap();
    assert!(matches!(
        decision,
        evreg_core::store::AdmissionDecision::Admitted(_)
    ));

    // Inside the grace period nothing happens.
    assert_eq!(engine.scheduler.token_repair_sweep().await.unwrap(), 0);

    engine.clock.set(datetime!(2025-01-10 08:10 UTC));
    assert_eq!(engine.scheduler.token_repair_sweep().await.unwrap(), 1);
    assert_eq!(engine.scheduler.token_repair_sweep().await.unwrap(), 0);

    let history = engine.history.participant_history(participant).await.unwrap();
    assert!(history[0].token.is_some());
}
