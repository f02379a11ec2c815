mod common;

use bioattend::engine::events::LedgerEvents;
use bioattend::engine::mark::{self, MarkRequest};
use bioattend::engine::{backfill, registry};
use bioattend::error::AppError;
use bioattend::model::ledger::{Direction, MarkStatus, SessionType};
use common::{at, count_entries, date, seed_staff, seed_student, test_pool};

const WINDOW: i64 = 15;

fn request(session_id: &str, student_id: &str) -> MarkRequest {
    MarkRequest {
        attendance_id: session_id.to_string(),
        student_id: student_id.to_string(),
        time_type: Direction::In,
        status: None,
        session_type: Some(SessionType::Am),
        section: None,
        occurred_at: None,
    }
}

#[tokio::test]
async fn rejects_within_window_and_allows_after() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let student = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let session = registry::create_named_session(&pool, &staff, "Morning Roll", date(2024, 3, 1))
        .await
        .unwrap()
        .id;

    let first = mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            occurred_at: Some(at(2024, 3, 1, 7, 0)),
            ..request(&session, &student)
        },
    )
    .await
    .unwrap();
    assert_eq!(first.status, MarkStatus::Present);

    // five minutes later: inside the window, hard reject
    let second = mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            occurred_at: Some(at(2024, 3, 1, 7, 5)),
            ..request(&session, &student)
        },
    )
    .await;
    assert!(matches!(
        second,
        Err(AppError::DuplicateMark { minutes: WINDOW })
    ));

    // sixteen minutes later: window expired, a second present entry lands
    mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            occurred_at: Some(at(2024, 3, 1, 7, 16)),
            ..request(&session, &student)
        },
    )
    .await
    .unwrap();

    let present = count_entries(
        &pool,
        "student_id = ? AND status = 'present'",
        &[student.as_str()],
    )
    .await;
    assert_eq!(present, 2);
}

#[tokio::test]
async fn opposite_direction_is_an_independent_slot() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let student = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let session = registry::create_named_session(&pool, &staff, "Morning Roll", date(2024, 3, 1))
        .await
        .unwrap()
        .id;

    mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            occurred_at: Some(at(2024, 3, 1, 7, 0)),
            ..request(&session, &student)
        },
    )
    .await
    .unwrap();

    // an OUT mark two minutes later is not a duplicate of the IN mark
    mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            time_type: Direction::Out,
            occurred_at: Some(at(2024, 3, 1, 7, 2)),
            ..request(&session, &student)
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn absent_placeholder_is_promoted_not_duplicated() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let s = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let s2 = seed_student(&pool, &staff, "Ben Diaz", "Grade 11", "BSIT-3A").await;

    let outcome = backfill::reconcile_day(&pool, &events, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(outcome.marked_absent, 2);

    // genuine present mark arrives for S later the same day
    mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            occurred_at: Some(at(2024, 3, 1, 8, 5)),
            ..request(&outcome.session_id, &s)
        },
    )
    .await
    .unwrap();

    let s_absent = count_entries(
        &pool,
        "student_id = ? AND status = 'absent'",
        &[s.as_str()],
    )
    .await;
    let s_present = count_entries(
        &pool,
        "student_id = ? AND status = 'present'",
        &[s.as_str()],
    )
    .await;
    let s2_absent = count_entries(
        &pool,
        "student_id = ? AND status = 'absent'",
        &[s2.as_str()],
    )
    .await;

    assert_eq!(s_absent, 0, "absent placeholder must be superseded");
    assert_eq!(s_present, 1);
    assert_eq!(s2_absent, 1, "untouched students keep their absent entry");
}

#[tokio::test]
async fn unknown_ids_are_fatal_to_the_call() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let student = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let session = registry::create_named_session(&pool, &staff, "Morning Roll", date(2024, 3, 1))
        .await
        .unwrap()
        .id;

    let bad_session = mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        request("missing-session", &student),
    )
    .await;
    assert!(matches!(bad_session, Err(AppError::NotFound(_))));

    let bad_student =
        mark::mark_attendance(&pool, &events, WINDOW, request(&session, "missing-student")).await;
    assert!(matches!(bad_student, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn session_type_defaults_from_policy_boundary() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let staff = seed_staff(&pool).await;
    let student = seed_student(&pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let session = registry::create_named_session(&pool, &staff, "Morning Roll", date(2024, 3, 1))
        .await
        .unwrap()
        .id;

    let afternoon = mark::mark_attendance(
        &pool,
        &events,
        WINDOW,
        MarkRequest {
            session_type: None,
            occurred_at: Some(at(2024, 3, 1, 13, 0)),
            ..request(&session, &student)
        },
    )
    .await
    .unwrap();

    assert_eq!(afternoon.session_type, Some(SessionType::Pm));
    assert_eq!(afternoon.section, "BSIT-3A", "section defaults from roster");
}
