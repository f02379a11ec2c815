mod common;

use actix_web::web::Data;
use actix_web::{App, test};
use bioattend::config::Config;
use bioattend::engine::events::LedgerEvents;
use bioattend::engine::registry;
use bioattend::routes;
use common::{date, seed_staff, seed_student, test_pool};
use serde_json::{Value, json};
use sqlx::SqlitePool;

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        duplicate_window_minutes: 15,
        resolver_url: "http://127.0.0.1:8800".to_string(),
        resolver_timeout_secs: 1,
        confidence_threshold: 40.0,
        kiosk_continuous_mode: false,
        kiosk_auto_confirm_secs: 0,
        roster_cache_ttl_secs: 60,
        sweep_parallelism: 2,
        rate_scan_per_min: 1000,
        rate_api_per_min: 1000,
        api_prefix: "/api/v1".to_string(),
    }
}

macro_rules! service {
    ($pool:expr, $events:expr) => {{
        let config = test_config();
        let routes_config = config.clone();
        test::init_service(
            App::new()
                .app_data(Data::new($pool.clone()))
                .app_data(Data::new(config))
                .app_data(Data::new($events.clone()))
                .configure(move |cfg| routes::configure(cfg, routes_config.clone())),
        )
        .await
    }};
}

async fn seed(pool: &SqlitePool) -> (String, String, String) {
    let staff = seed_staff(pool).await;
    let s1 = seed_student(pool, &staff, "Ana Cruz", "Grade 11", "BSIT-3A").await;
    let s2 = seed_student(pool, &staff, "Ben Diaz", "Grade 11", "BSIT-3A").await;
    (staff, s1, s2)
}

#[actix_web::test]
async fn mark_then_duplicate_then_not_found() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let (staff, s1, _s2) = seed(&pool).await;
    let session = registry::create_named_session(&pool, &staff, "Roll", date(2024, 3, 1))
        .await
        .unwrap()
        .id;
    let app = service!(pool, events);

    let req = test::TestRequest::post()
        .uri("/api/v1/marks")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(json!({
            "attendance_id": session,
            "student_id": s1,
            "time_type": "IN",
            "occurred_at": "2024-03-01T07:40:00"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Attendance marked successfully");
    assert_eq!(body["entry"]["status"], "present");

    // same slot five minutes later: 409 with the operator-facing envelope
    let req = test::TestRequest::post()
        .uri("/api/v1/marks")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(json!({
            "attendance_id": session,
            "student_id": s1,
            "time_type": "IN",
            "occurred_at": "2024-03-01T07:45:00"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_type"], "STUDENT_ALREADY_MARKED");

    // unknown student: 404 envelope
    let req = test::TestRequest::post()
        .uri("/api/v1/marks")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(json!({
            "attendance_id": session,
            "student_id": "missing",
            "time_type": "IN"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_type"], "NOT_FOUND");
}

#[actix_web::test]
async fn manual_mark_reports_inserted_and_skipped() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let (staff, s1, s2) = seed(&pool).await;
    let session = registry::create_named_session(&pool, &staff, "Makeup", date(2024, 3, 4))
        .await
        .unwrap()
        .id;
    let app = service!(pool, events);

    let payload = json!({
        "attendance_id": session,
        "student_ids": [s1, s2],
        "dates": ["2024-03-04", "2024-03-05"]
    });

    let req = test::TestRequest::post()
        .uri("/api/v1/marks/manual")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(&payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["inserted"], 4);
    assert_eq!(body["skipped"], 0);

    let req = test::TestRequest::post()
        .uri("/api/v1/marks/manual")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(&payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["inserted"], 0);
    assert_eq!(body["skipped"], 4);
}

#[actix_web::test]
async fn ledger_report_is_complete_after_reconciliation() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let (staff, s1, _s2) = seed(&pool).await;

    // one genuine mark; the report request reconciles the rest of the roster
    let session = registry::resolve_or_create_daily_session(&pool, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    bioattend::engine::mark::mark_attendance(
        &pool,
        &events,
        15,
        bioattend::engine::mark::MarkRequest {
            attendance_id: session.id.clone(),
            student_id: s1.clone(),
            time_type: bioattend::model::ledger::Direction::In,
            status: None,
            session_type: None,
            section: None,
            occurred_at: Some(date(2024, 3, 1).and_hms_opt(7, 10, 0).unwrap()),
        },
    )
    .await
    .unwrap();

    let app = service!(pool, events);

    let uri = format!(
        "/api/v1/reports/ledger?staff_id={staff}&date_from=2024-03-01&date_to=2024-03-01&per_page=50"
    );
    let req = test::TestRequest::get()
        .uri(&uri)
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    // both students appear: one present, one backfilled absent
    assert_eq!(body["total"], 2);
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"present"));
    assert!(statuses.contains(&"absent"));

    // absent filter narrows to the backfilled student
    let uri = format!(
        "/api/v1/reports/ledger?staff_id={staff}&date_from=2024-03-01&date_to=2024-03-01&status=absent"
    );
    let req = test::TestRequest::get()
        .uri(&uri)
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    // late filter: 07:10 against 07:30 + 15min grace is on time
    let uri = format!(
        "/api/v1/reports/ledger?staff_id={staff}&date_from=2024-03-01&date_to=2024-03-01&status=late"
    );
    let req = test::TestRequest::get()
        .uri(&uri)
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn daily_summary_counts_by_grade_and_section() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let (staff, s1, _s2) = seed(&pool).await;

    let session = registry::resolve_or_create_daily_session(&pool, &staff, date(2024, 3, 1))
        .await
        .unwrap();
    bioattend::engine::mark::mark_attendance(
        &pool,
        &events,
        15,
        bioattend::engine::mark::MarkRequest {
            attendance_id: session.id.clone(),
            student_id: s1,
            time_type: bioattend::model::ledger::Direction::In,
            status: None,
            session_type: None,
            section: None,
            occurred_at: Some(date(2024, 3, 1).and_hms_opt(7, 10, 0).unwrap()),
        },
    )
    .await
    .unwrap();

    let app = service!(pool, events);

    let uri = format!("/api/v1/reports/daily-summary?staff_id={staff}&date=2024-03-01");
    let req = test::TestRequest::get()
        .uri(&uri)
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["grade"], "Grade 11");
    assert_eq!(rows[0]["section"], "BSIT-3A");
    assert_eq!(rows[0]["present"], 1);
    assert_eq!(rows[0]["absent"], 1);
    assert_eq!(rows[0]["rate"], 50.0);
}

#[actix_web::test]
async fn session_crud_round_trip() {
    let pool = test_pool().await;
    let events = LedgerEvents::default();
    let (staff, _s1, _s2) = seed(&pool).await;
    let app = service!(pool, events);

    let req = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .set_json(json!({
            "staff_id": staff,
            "name": "Makeup Day",
            "date": "2024-03-04"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = body["session"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["session"]["kind"], "named");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/sessions/{session_id}"))
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["deleted"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/sessions/{session_id}"))
        .peer_addr("127.0.0.1:9000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
