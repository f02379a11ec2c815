use crate::error::{AppError, AppResult, is_unique_violation};
use crate::model::session::{AttendanceSession, SessionKind};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, staff_id, name, date, kind, created_at";

pub async fn staff_exists(pool: &SqlitePool, staff_id: &str) -> AppResult<()> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM staff WHERE id = ?")
        .bind(staff_id)
        .fetch_optional(pool)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Staff")),
    }
}

pub async fn fetch_session(pool: &SqlitePool, session_id: &str) -> AppResult<AttendanceSession> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM attendances WHERE id = ?");
    let session = sqlx::query_as::<_, AttendanceSession>(&sql)
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    session.ok_or_else(|| AppError::not_found("Attendance session"))
}

async fn fetch_auto_session(
    pool: &SqlitePool,
    staff_id: &str,
    date: NaiveDate,
) -> AppResult<Option<AttendanceSession>> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM attendances WHERE staff_id = ? AND date = ? AND kind = 'auto'"
    );
    let session = sqlx::query_as::<_, AttendanceSession>(&sql)
        .bind(staff_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Look up the auto session for staff+date, creating it if missing.
///
/// Safe under concurrent first-scan-of-the-day races: the partial unique
/// index on (staff_id, date) arbitrates, and the loser re-reads the winner's
/// row instead of surfacing the violation.
pub async fn resolve_or_create_daily_session(
    pool: &SqlitePool,
    staff_id: &str,
    date: NaiveDate,
) -> AppResult<AttendanceSession> {
    staff_exists(pool, staff_id).await?;

    if let Some(session) = fetch_auto_session(pool, staff_id, date).await? {
        return Ok(session);
    }

    let id = Uuid::new_v4().to_string();
    let name = format!("Daily Attendance - {date}");
    let result = sqlx::query(
        "INSERT INTO attendances (id, staff_id, name, date, kind, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(staff_id)
    .bind(&name)
    .bind(date)
    .bind(SessionKind::Auto)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await;

    match result {
        Ok(_) => fetch_session(pool, &id).await,
        Err(e) if is_unique_violation(&e) => {
            debug!(staff_id, %date, "Lost daily-session creation race, re-reading");
            fetch_auto_session(pool, staff_id, date).await?.ok_or_else(|| {
                AppError::Conflict("auto session missing after unique violation".to_string())
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Explicit staff action; deliberately not deduped against the daily
/// session. Several named sessions on one date are legal.
pub async fn create_named_session(
    pool: &SqlitePool,
    staff_id: &str,
    name: &str,
    date: NaiveDate,
) -> AppResult<AttendanceSession> {
    staff_exists(pool, staff_id).await?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO attendances (id, staff_id, name, date, kind, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(staff_id)
    .bind(name)
    .bind(date)
    .bind(SessionKind::Named)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    fetch_session(pool, &id).await
}

/// Rename is the only legal session update.
pub async fn rename_session(pool: &SqlitePool, session_id: &str, name: &str) -> AppResult<()> {
    let result = sqlx::query("UPDATE attendances SET name = ? WHERE id = ?")
        .bind(name)
        .bind(session_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Attendance session"));
    }
    Ok(())
}

/// Deletes the session and every ledger entry attached to it, atomically.
pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM student_attendances WHERE attendance_id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM attendances WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Attendance session"));
    }

    tx.commit().await?;
    Ok(())
}

pub async fn list_sessions(
    pool: &SqlitePool,
    staff_id: &str,
    page: u32,
    per_page: u32,
) -> AppResult<(Vec<AttendanceSession>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendances WHERE staff_id = ?")
        .bind(staff_id)
        .fetch_one(pool)
        .await?;

    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM attendances WHERE staff_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let sessions = sqlx::query_as::<_, AttendanceSession>(&sql)
        .bind(staff_id)
        .bind(per_page as i64)
        .bind(((page - 1) * per_page) as i64)
        .fetch_all(pool)
        .await?;

    Ok((sessions, total))
}
