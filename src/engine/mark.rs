use crate::engine::events::{LedgerEvent, LedgerEvents};
use crate::engine::lateness;
use crate::engine::registry;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::model::ledger::{Direction, LedgerEntry, MANUAL_SECTION, MarkStatus, SessionType};
use crate::model::student::Student;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// One mark request, biometric- or human-sourced. Every attendance event
/// passes through `mark_attendance`; this is the integrity boundary.
#[derive(Debug, Clone)]
pub struct MarkRequest {
    pub attendance_id: String,
    pub student_id: String,
    pub time_type: Direction,
    /// Defaults to present.
    pub status: Option<MarkStatus>,
    /// Defaults from the staff policy's PM boundary hour.
    pub session_type: Option<SessionType>,
    /// Defaults to the student's roster section.
    pub section: Option<String>,
    /// Defaults to the server clock.
    pub occurred_at: Option<NaiveDateTime>,
}

pub async fn mark_attendance(
    pool: &SqlitePool,
    events: &LedgerEvents,
    window_minutes: i64,
    req: MarkRequest,
) -> AppResult<LedgerEntry> {
    let session = registry::fetch_session(pool, &req.attendance_id).await?;

    let student = sqlx::query_as::<_, Student>(
        "SELECT id, staff_id, name, matric_no, grade, section, created_at FROM students WHERE id = ?",
    )
    .bind(&req.student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Student"))?;

    let occurred_at = req.occurred_at.unwrap_or_else(|| Utc::now().naive_utc());
    let status = req.status.unwrap_or(MarkStatus::Present);
    let policy = lateness::fetch_policy_or_default(pool, &session.staff_id).await;
    let session_type = req
        .session_type
        .unwrap_or_else(|| lateness::default_session_type(occurred_at, &policy));
    let section = req.section.unwrap_or_else(|| student.section.clone());

    // Duplicate check, absent-row promotion and the insert commit or roll
    // back together; no intermediate state is ever visible to readers.
    let mut tx = pool.begin().await?;

    let window_start = occurred_at - Duration::minutes(window_minutes);
    let duplicate: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT id FROM student_attendances
        WHERE student_id = ? AND attendance_id = ? AND time_type = ? AND status = 'present'
          AND created_at > ?
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(&req.student_id)
    .bind(&req.attendance_id)
    .bind(req.time_type)
    .bind(window_start)
    .fetch_optional(&mut *tx)
    .await?;

    if duplicate.is_some() {
        return Err(AppError::DuplicateMark {
            minutes: window_minutes,
        });
    }

    if status == MarkStatus::Present {
        // A genuine present mark supersedes the day's absent placeholders,
        // whichever session the backfill parked them in.
        sqlx::query(
            r#"
            DELETE FROM student_attendances
            WHERE student_id = ? AND status = 'absent'
              AND attendance_id IN (SELECT id FROM attendances WHERE date = ?)
            "#,
        )
        .bind(&req.student_id)
        .bind(session.date)
        .execute(&mut *tx)
        .await?;
    }

    let entry = LedgerEntry {
        id: Uuid::new_v4().to_string(),
        student_id: req.student_id.clone(),
        attendance_id: req.attendance_id.clone(),
        time_type: req.time_type,
        status,
        section,
        session_type: Some(session_type),
        created_at: occurred_at,
    };

    insert_entry(&mut tx, &entry).await?;
    tx.commit().await?;

    info!(
        student_id = %entry.student_id,
        attendance_id = %entry.attendance_id,
        direction = %entry.time_type,
        status = %entry.status,
        "Attendance marked"
    );
    events.emit(LedgerEvent::Marked {
        entry: entry.clone(),
    });

    Ok(entry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct ManualMarkOutcome {
    pub inserted: i64,
    pub skipped: i64,
}

/// Bulk backfill-style correction: one entry per (student, date) pair not
/// already represented in the session's ledger. Already-marked pairs are
/// skipped and counted, so a repeat call inserts nothing.
pub async fn manual_mark(
    pool: &SqlitePool,
    events: &LedgerEvents,
    attendance_id: &str,
    student_ids: &[String],
    status: MarkStatus,
    dates: &[NaiveDate],
    section: Option<&str>,
) -> AppResult<ManualMarkOutcome> {
    registry::fetch_session(pool, attendance_id).await?;

    let mut tx = pool.begin().await?;

    let existing: Vec<(String, String)> = sqlx::query_as(
        "SELECT student_id, substr(created_at, 1, 10) FROM student_attendances WHERE attendance_id = ?",
    )
    .bind(attendance_id)
    .fetch_all(&mut *tx)
    .await?;
    let existing: HashSet<(String, String)> = existing.into_iter().collect();

    let mut inserted = 0i64;
    let mut skipped = 0i64;

    for student_id in student_ids {
        for date in dates {
            if existing.contains(&(student_id.clone(), date.to_string())) {
                skipped += 1;
                continue;
            }

            let entry = LedgerEntry {
                id: Uuid::new_v4().to_string(),
                student_id: student_id.clone(),
                attendance_id: attendance_id.to_string(),
                time_type: Direction::In,
                status,
                section: section.unwrap_or(MANUAL_SECTION).to_string(),
                session_type: None,
                // noon, so manual entries sort inside the school day
                created_at: date.and_hms_opt(12, 0, 0).unwrap(),
            };
            insert_entry(&mut tx, &entry).await.map_err(|e| match e {
                AppError::Database(db) if is_foreign_key_violation(&db) => {
                    AppError::not_found("Student")
                }
                other => other,
            })?;
            inserted += 1;
        }
    }

    tx.commit().await?;

    if inserted > 0 {
        events.emit(LedgerEvent::BulkMarked {
            attendance_id: attendance_id.to_string(),
            inserted,
        });
    }

    Ok(ManualMarkOutcome { inserted, skipped })
}

async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &LedgerEntry,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO student_attendances
            (id, student_id, attendance_id, time_type, status, section, session_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.student_id)
    .bind(&entry.attendance_id)
    .bind(entry.time_type)
    .bind(entry.status)
    .bind(&entry.section)
    .bind(entry.session_type)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            // the engine's own checks should make this unreachable
            AppError::Conflict(format!("ledger insert for student {}", entry.student_id))
        } else {
            e.into()
        }
    })?;

    Ok(())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation
    )
}
