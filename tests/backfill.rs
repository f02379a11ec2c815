mod common;

use bioattend::engine::events::LedgerEvents;
use bioattend::engine::mark::{self, MarkRequest};
use bioattend::engine::{backfill, registry};
use bioattend::error::AppError;
use bioattend::model::ledger::Direction;
use bioattend::model::session::SessionKind;
use common::{at, count_entries, date, seed_staff, seed_student, test_pool};

#[tokio::test]
async fn fills_gaps_and_is_idempotent() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let scanned = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let _missed = seed_student(&pool, &staff, "Ben Diaz", "Grade 11", "BSIT-3A").await;
    let _missed2 = seed_student(&pool, &staff, "Cara Uy", "Grade 12", "BSIT-4B").await;

    // one student scanned earlier in the day
    let session = registry::resolve_or_create_daily_session(&pool, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    mark::mark_attendance(
        &pool,
        &events,
        15,
        MarkRequest {
            attendance_id: session.id.clone(),
            student_id: scanned.clone(),
            time_type: Direction::In,
            status: None,
            session_type: None,
            section: None,
            occurred_at: Some(at(2024, 3, 1, 7, 10)),
        },
    )
    .await
    .unwrap();

    let first = backfill::reconcile_day(&pool, &events, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(first.session_id, session.id);
    assert_eq!(first.marked_absent, 2);

    // completeness: every enrolled student has at least one entry
    let students_with_entries = count_entries(
        &pool,
        "attendance_id = ? AND student_id IN (SELECT id FROM students)",
        &[session.id.as_str()],
    )
    .await;
    assert_eq!(students_with_entries, 3);

    // the scanned student's genuine entry was never touched
    let scanned_present = count_entries(
        &pool,
        "student_id = ? AND status = 'present'",
        &[scanned.as_str()],
    )
    .await;
    assert_eq!(scanned_present, 1);

    // second run is a no-op
    let second = backfill::reconcile_day(&pool, &events, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(second.marked_absent, 0);
    let total = count_entries(&pool, "attendance_id = ?", &[session.id.as_str()]).await;
    assert_eq!(total, 3);
}

#[tokio::test]
async fn synthesizes_the_daily_auto_session() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;

    let outcome = backfill::reconcile_day(&pool, &events, &staff, date(2024, 3, 1))
        .await
        .unwrap();

    let session = registry::fetch_session(&pool, &outcome.session_id).await.unwrap();
    assert_eq!(session.kind, SessionKind::Auto);
    assert_eq!(session.name, "Daily Attendance - 2024-03-01");
    assert_eq!(session.date, date(2024, 3, 1));

    // absent rows carry the sentinel section and IN direction
    let sentinel = count_entries(
        &pool,
        "attendance_id = ? AND section = 'AUTO' AND time_type = 'IN' AND status = 'absent'",
        &[outcome.session_id.as_str()],
    )
    .await;
    assert_eq!(sentinel, 1);
}

#[tokio::test]
async fn unknown_staff_is_not_found() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();

    let result = backfill::reconcile_day(&pool, &events, "missing-staff", date(2024, 3, 1)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn sweep_covers_every_staff_member() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff_a = seed_staff(&pool).await;
    let staff_b = seed_staff(&pool).await;
    seed_student(&pool, &staff_a, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    seed_student(&pool, &staff_a, "Ben Diaz", "Grade 11", "BSIT-3A").await;
    seed_student(&pool, &staff_b, "Cara Uy", "Grade 12", "BSIT-4B").await;

    let summary = backfill::reconcile_all_staff(&pool, &events, date(2024, 3, 1), 4)
        .await
        .unwrap();

    assert_eq!(summary.staff_total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.marked_absent, 3);

    // a second sweep finds nothing to do
    let again = backfill::reconcile_all_staff(&pool, &events, date(2024, 3, 1), 4)
        .await
        .unwrap();
    assert_eq!(again.marked_absent, 0);
}
