use crate::engine::backfill;
use crate::engine::events::LedgerEvents;
use crate::engine::lateness;
use crate::error::AppResult;
use crate::model::ledger::{Direction, MarkStatus, SessionType};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ReconcilePayload {
    pub staff_id: String,
    #[schema(example = "2024-03-01", format = "date", value_type = String)]
    pub date: NaiveDate,
}

/// Run the absent backfill for one staff+date on demand
#[utoipa::path(
    post,
    path = "/api/v1/reconcile",
    request_body = ReconcilePayload,
    responses(
        (status = 200, description = "Reconciliation completed", body = Object, example = json!({
            "message": "Absent marking completed for unmarked students",
            "session_id": "2f4fd83e-7e55-4a32-9d5d-3fdc0a9b0f11",
            "marked_absent": 3
        })),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reports"
)]
pub async fn reconcile_now(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    payload: web::Json<ReconcilePayload>,
) -> AppResult<impl Responder> {
    let outcome = backfill::reconcile_day(&pool, &events, &payload.staff_id, payload.date).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Absent marking completed for unmarked students",
        "session_id": outcome.session_id,
        "marked_absent": outcome.marked_absent,
    })))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LedgerQuery {
    pub staff_id: String,
    #[param(value_type = Option<String>)]
    pub date_from: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub date_to: Option<NaiveDate>,
    pub grade: Option<String>,
    pub section: Option<String>,
    pub session_type: Option<SessionType>,
    /// present | absent | late (late is derived against the staff policy)
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct LedgerReportRow {
    pub id: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
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
    /// Derived at read time; never stored on the ledger.
    #[sqlx(default)]
    pub is_late: bool,
}

#[derive(Serialize, ToSchema)]
pub struct LedgerReportResponse {
    pub data: Vec<LedgerReportRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

// Typed sqlx binding for the dynamically-built WHERE clause
enum FilterValue<'a> {
    Str(&'a str),
    Date(NaiveDate),
}

/// Ledger report, reconciled before reading
///
/// Every day in the requested range (clamped to today) is reconciled first,
/// so the response never silently misses an enrolled student.
#[utoipa::path(
    get,
    path = "/api/v1/reports/ledger",
    params(LedgerQuery),
    responses(
        (status = 200, description = "Filtered ledger entries", body = LedgerReportResponse),
        (status = 400, description = "Bad date range"),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reports"
)]
pub async fn ledger_report(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    query: web::Query<LedgerQuery>,
) -> AppResult<impl Responder> {
    let today = Utc::now().date_naive();
    let date_from = query.date_from.unwrap_or(today);
    let date_to = query.date_to.unwrap_or(date_from);

    if date_to < date_from {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "date_to cannot be before date_from"
        })));
    }
    if (date_to - date_from).num_days() > 366 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Date range too large (max 366 days)"
        })));
    }

    // Reconcile the requested days so the read is complete.
    let mut day = date_from;
    while day <= date_to.min(today) {
        backfill::reconcile_day(&pool, &events, &query.staff_id, day).await?;
        day = day.succ_opt().expect("date overflow");
    }

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE a.staff_id = ? AND a.date >= ? AND a.date <= ?");
    let mut args: Vec<FilterValue> = vec![
        FilterValue::Str(&query.staff_id),
        FilterValue::Date(date_from),
        FilterValue::Date(date_to),
    ];

    if let Some(grade) = query.grade.as_deref() {
        where_sql.push_str(" AND s.grade = ?");
        args.push(FilterValue::Str(grade));
    }
    if let Some(section) = query.section.as_deref() {
        where_sql.push_str(" AND s.section = ?");
        args.push(FilterValue::Str(section));
    }
    if let Some(session_type) = query.session_type {
        where_sql.push_str(" AND sa.session_type = ?");
        args.push(FilterValue::Str(match session_type {
            SessionType::Am => "AM",
            SessionType::Pm => "PM",
        }));
    }

    let status = query.status.as_deref();
    match status {
        Some("present") => where_sql.push_str(" AND sa.status = 'present'"),
        Some("absent") => where_sql.push_str(" AND sa.status = 'absent'"),
        // lateness is derived, so the SQL filter narrows to candidates only
        Some("late") => where_sql.push_str(" AND sa.status = 'present' AND sa.time_type = 'IN'"),
        Some(other) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("Unknown status filter '{other}' (present, absent or late)")
            })));
        }
        None => {}
    }

    let data_sql = format!(
        r#"
        SELECT sa.id, a.date, sa.student_id, s.name AS student_name, s.matric_no,
               s.grade, s.section AS section, sa.time_type, sa.status, sa.session_type,
               sa.created_at, 0 AS is_late
        FROM student_attendances sa
        JOIN attendances a ON a.id = sa.attendance_id
        JOIN students s ON s.id = sa.student_id
        {where_sql}
        ORDER BY sa.created_at DESC
        "#
    );
    debug!(sql = %data_sql, "Fetching ledger report");

    let mut data_query = sqlx::query_as::<_, LedgerReportRow>(&data_sql);
    for arg in &args {
        data_query = match arg {
            FilterValue::Str(s) => data_query.bind(*s),
            FilterValue::Date(d) => data_query.bind(*d),
        };
    }

    let mut rows = data_query
        .fetch_all(pool.get_ref())
        .await
        .map_err(crate::error::AppError::from)?;

    let policy = lateness::fetch_policy_or_default(&pool, &query.staff_id).await;
    for row in &mut rows {
        row.is_late = row.status == MarkStatus::Present
            && lateness::is_late_arrival(row.created_at, row.session_type, row.time_type, &policy);
    }
    if status == Some("late") {
        rows.retain(|row| row.is_late);
    }

    // lateness is computed per row, so pagination slices in memory
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let total = rows.len() as i64;
    let start = ((page - 1) * per_page) as usize;
    let data: Vec<LedgerReportRow> = if start >= rows.len() {
        Vec::new()
    } else {
        rows.drain(start..rows.len().min(start + per_page as usize))
            .collect()
    };

    Ok(HttpResponse::Ok().json(LedgerReportResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Deserialize, IntoParams)]
pub struct DailySummaryQuery {
    pub staff_id: String,
    #[param(value_type = String)]
    pub date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct DailySummaryRow {
    pub grade: String,
    pub section: String,
    pub present: i64,
    pub absent: i64,
    pub total: i64,
    #[schema(example = 87.5)]
    pub rate: f64,
}

/// Per grade-section present/absent counts for one date
#[utoipa::path(
    get,
    path = "/api/v1/reports/daily-summary",
    params(DailySummaryQuery),
    responses(
        (status = 200, description = "Daily summary rows", body = [DailySummaryRow]),
        (status = 404, description = "Staff not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Reports"
)]
pub async fn daily_summary(
    pool: web::Data<SqlitePool>,
    events: web::Data<LedgerEvents>,
    query: web::Query<DailySummaryQuery>,
) -> AppResult<impl Responder> {
    backfill::reconcile_day(&pool, &events, &query.staff_id, query.date).await?;

    let rows: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT DISTINCT sa.student_id, s.grade || '|' || s.section, sa.status
        FROM student_attendances sa
        JOIN attendances a ON a.id = sa.attendance_id
        JOIN students s ON s.id = sa.student_id
        WHERE a.staff_id = ? AND a.date = ?
        "#,
    )
    .bind(&query.staff_id)
    .bind(query.date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(crate::error::AppError::from)?;

    let mut groups: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for (_student_id, group, status) in rows {
        let counts = groups.entry(group).or_default();
        if status == "present" {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
    }

    let summary: Vec<DailySummaryRow> = groups
        .into_iter()
        .map(|(group, (present, absent))| {
            let (grade, section) = group.split_once('|').unwrap_or((group.as_str(), ""));
            let total = present + absent;
            let rate = if total > 0 {
                (present as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
            } else {
                0.0
            };
            DailySummaryRow {
                grade: grade.to_string(),
                section: section.to_string(),
                present,
                absent,
                total,
                rate,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(summary))
}
