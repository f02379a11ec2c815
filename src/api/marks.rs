use crate::config::Config;
use crate::engine::events::LedgerEvents;
use crate::engine::mark::{self, ManualMarkOutcome, MarkRequest};
use crate::error::AppResult;
use crate::model::ledger::{Direction, LedgerEntry, MarkStatus, SessionType};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct MarkPayload {
    pub attendance_id: String,
    pub student_id: String,
    pub time_type: Direction,
    /// Defaults to present
    pub status: Option<MarkStatus>,
    pub session_type: Option<SessionType>,
    pub section: Option<String>,
    /// Defaults to the server clock
    #[schema(value_type = Option<String>, format = "date-time")]
    pub occurred_at: Option<NaiveDateTime>,
}

#[derive(Deserialize, ToSchema)]
pub struct ManualMarkPayload {
    pub attendance_id: String,
    pub student_ids: Vec<String>,
    /// Defaults to present
    pub status: Option<MarkStatus>,
    #[schema(value_type = Vec<String>, format = "date")]
    pub dates: Vec<NaiveDate>,
    pub section: Option<String>,
}

/// Mark one attendance event
#[utoipa::path(
    post,
    path = "/api/v1/marks",
    request_body = MarkPayload,
    responses(
        (status = 200, description = "Attendance marked", body = LedgerEntry),
        (status = 404, description = "Session or student not found", body = Object, example = json!({
            "message": "Student not found",
            "error_type": "NOT_FOUND"
        })),
        (status = 409, description = "Already checked in within the suppression window", body = Object, example = json!({
            "message": "Student has already checked in within the last 15 minutes. Please wait before checking in again.",
            "error_type": "STUDENT_ALREADY_MARKED"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Marks"
)]
pub async fn mark_attendance(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    config: web::Data<Config>,
    payload: web::Json<MarkPayload>,
) -> AppResult<impl Responder> {
    let payload = payload.into_inner();

    let entry = mark::mark_attendance(
        &pool,
        &events,
        config.duplicate_window_minutes,
        MarkRequest {
            attendance_id: payload.attendance_id,
            student_id: payload.student_id,
            time_type: payload.time_type,
            status: payload.status,
            session_type: payload.session_type,
            section: payload.section,
            occurred_at: payload.occurred_at,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance marked successfully",
        "entry": entry,
    })))
}

/// Bulk manual marking for (student, date) pairs
#[utoipa::path(
    post,
    path = "/api/v1/marks/manual",
    request_body = ManualMarkPayload,
    responses(
        (status = 200, description = "Manual attendance marked", body = ManualMarkOutcome, example = json!({
            "message": "Manual attendance marked successfully",
            "inserted": 4,
            "skipped": 2
        })),
        (status = 400, description = "Empty student or date list"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Marks"
)]
pub async fn manual_mark(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    payload: web::Json<ManualMarkPayload>,
) -> AppResult<impl Responder> {
    let payload = payload.into_inner();

    if payload.student_ids.is_empty() || payload.dates.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "student_ids and dates must be non-empty arrays"
        })));
    }

    let outcome = mark::manual_mark(
        &pool,
        &events,
        &payload.attendance_id,
        &payload.student_ids,
        payload.status.unwrap_or(MarkStatus::Present),
        &payload.dates,
        payload.section.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Manual attendance marked successfully",
        "inserted": outcome.inserted,
        "skipped": outcome.skipped,
    })))
}
