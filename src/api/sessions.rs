use crate::engine::registry;
use crate::error::AppResult;
use crate::model::ledger::{Direction, MarkStatus, SessionType};
use crate::model::session::AttendanceSession;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateSession {
    pub staff_id: String,
    #[schema(example = "Makeup Day - Grade 11")]
    pub name: String,
    #[schema(example = "2024-03-01", format = "date", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SessionQuery {
    pub staff_id: String,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionListResponse {
    pub data: Vec<AttendanceSession>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameSession {
    #[schema(example = "Daily Attendance - 2024-03-01")]
    pub name: String,
}

/// Create a named session
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = CreateSession,
    responses(
        (status = 200, description = "Session created successfully", body = AttendanceSession),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Sessions"
)]
pub async fn create_session(
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateSession>,
) -> AppResult<impl Responder> {
    let session =
        registry::create_named_session(&pool, &payload.staff_id, &payload.name, payload.date)
            .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance session created successfully",
        "session": session,
    })))
}

/// List sessions for a staff member
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    params(SessionQuery),
    responses(
        (status = 200, description = "Paginated session list", body = SessionListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Sessions"
)]
pub async fn list_sessions(
    pool: web::Data<SqlitePool>,
    query: web::Query<SessionQuery>,
) -> AppResult<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let (sessions, total) = registry::list_sessions(&pool, &query.staff_id, page, per_page).await?;

    Ok(HttpResponse::Ok().json(SessionListResponse {
        data: sessions,
        page,
        per_page,
        total,
    }))
}

/// Get one session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    params(("session_id", Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session found", body = AttendanceSession),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
pub async fn get_session(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let session = registry::fetch_session(&pool, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// Rename a session
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{session_id}",
    params(("session_id", Path, description = "Session ID")),
    request_body = RenameSession,
    responses(
        (status = 200, description = "Session renamed successfully"),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
pub async fn rename_session(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    payload: web::Json<RenameSession>,
) -> AppResult<impl Responder> {
    registry::rename_session(&pool, &path.into_inner(), &payload.name).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance session renamed successfully"
    })))
}

/// Delete a session and all its ledger entries
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{session_id}",
    params(("session_id", Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
pub async fn delete_session(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    registry::delete_session(&pool, &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance session deleted successfully",
        "deleted": true,
    })))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct SessionEntryRow {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub matric_no: String,
    pub grade: String,
    pub section: String,
    pub time_type: Direction,
    pub status: MarkStatus,
    pub session_type: Option<SessionType>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct SessionEntriesResponse {
    pub data: Vec<SessionEntryRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// List a session's ledger entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/entries",
    params(
        ("session_id", Path, description = "Session ID"),
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Paginated entry list", body = SessionEntriesResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions"
)]
pub async fn list_session_entries(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<impl Responder> {
    let session_id = path.into_inner();
    registry::fetch_session(&pool, &session_id).await?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM student_attendances WHERE attendance_id = ?")
            .bind(&session_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(crate::error::AppError::from)?;

    let rows = sqlx::query_as::<_, SessionEntryRow>(
        r#"
        SELECT sa.id, sa.student_id, s.name AS student_name, s.matric_no, s.grade,
               sa.section, sa.time_type, sa.status, sa.session_type, sa.created_at
        FROM student_attendances sa
        JOIN students s ON s.id = sa.student_id
        WHERE sa.attendance_id = ?
        ORDER BY sa.created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&session_id)
    .bind(per_page as i64)
    .bind(((page - 1) * per_page) as i64)
    .fetch_all(pool.get_ref())
    .await
    .map_err(crate::error::AppError::from)?;

    Ok(HttpResponse::Ok().json(SessionEntriesResponse {
        data: rows,
        page,
        per_page,
        total,
    }))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
