use crate::engine::events::LedgerEvents;
use crate::error::AppResult;
use crate::kiosk::orchestrator::{Kiosk, ScanOutcome, ScanRequest};
use crate::kiosk::resolver::HttpResolver;
use crate::kiosk::roster::RosterCache;
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::SqlitePool;

/// Identify a fingerprint sample and mark attendance
///
/// Identification failures come back as 200 with a rejection the operator
/// can read; mark-engine rejections (duplicate within the window, unknown
/// ids) use the error envelope so kiosks can distinguish them.
#[utoipa::path(
    post,
    path = "/api/v1/kiosk/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan processed", body = ScanOutcome),
        (status = 404, description = "Session or student not found"),
        (status = 409, description = "Already checked in within the suppression window"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Kiosk"
)]
pub async fn scan(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    kiosk: web::Data<Kiosk<HttpResolver>>,
    payload: web::Json<ScanRequest>,
) -> AppResult<impl Responder> {
    let outcome = kiosk
        .process_scan(&pool, &events, payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Current identification phase of one terminal
#[utoipa::path(
    get,
    path = "/api/v1/kiosk/terminals/{terminal_id}/phase",
    params(("terminal_id", Path, description = "Kiosk terminal ID")),
    responses((status = 200, description = "Terminal phase", body = Object, example = json!({"phase": "idle"}))),
    tag = "Kiosk"
)]
pub async fn terminal_phase(
    kiosk: web::Data<Kiosk<HttpResolver>>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let phase = kiosk.phase(&path.into_inner());
    Ok(HttpResponse::Ok().json(json!({ "phase": phase })))
}

/// Drop the cached roster snapshot for a staff member
///
/// Enrollment management calls this after adding or removing templates.
#[utoipa::path(
    post,
    path = "/api/v1/kiosk/roster/{staff_id}/refresh",
    params(("staff_id", Path, description = "Staff ID")),
    responses((status = 200, description = "Roster snapshot invalidated")),
    tag = "Kiosk"
)]
pub async fn refresh_roster(
    roster: web::Data<RosterCache>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    roster.invalidate(&path.into_inner()).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Roster snapshot invalidated" })))
}
