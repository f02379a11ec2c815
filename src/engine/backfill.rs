use crate::engine::events::{LedgerEvent, LedgerEvents};
use crate::engine::registry;
use crate::error::AppResult;
use crate::model::ledger::{AUTO_SECTION, Direction, MarkStatus};
use chrono::NaiveDate;
use futures::StreamExt;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReconcileOutcome {
    pub session_id: String,
    pub marked_absent: i64,
}

/// Fill-gaps sweep for one staff+date: every enrolled student without a
/// ledger entry in the daily session gets a synthetic absent row. Students
/// with any entry at all are never touched, so running it twice is a no-op
/// the second time.
pub async fn reconcile_day(
    pool: &SqlitePool,
    events: &LedgerEvents,
    staff_id: &str,
    date: NaiveDate,
) -> AppResult<ReconcileOutcome> {
    let session = registry::resolve_or_create_daily_session(pool, staff_id, date).await?;

    let students: Vec<(String,)> = sqlx::query_as("SELECT id FROM students WHERE staff_id = ?")
        .bind(staff_id)
        .fetch_all(pool)
        .await?;

    let already_marked: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT student_id FROM student_attendances WHERE attendance_id = ?",
    )
    .bind(&session.id)
    .fetch_all(pool)
    .await?;
    let already_marked: HashSet<String> = already_marked.into_iter().map(|(id,)| id).collect();

    let unmarked: Vec<&String> = students
        .iter()
        .map(|(id,)| id)
        .filter(|id| !already_marked.contains(*id))
        .collect();

    let mut tx = pool.begin().await?;
    for student_id in &unmarked {
        sqlx::query(
            r#"
            INSERT INTO student_attendances
                (id, student_id, attendance_id, time_type, status, section, session_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(student_id)
        .bind(&session.id)
        .bind(Direction::In)
        .bind(MarkStatus::Absent)
        .bind(AUTO_SECTION)
        .bind(date.and_hms_opt(0, 0, 0).unwrap())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let marked_absent = unmarked.len() as i64;
    if marked_absent > 0 {
        info!(staff_id, %date, marked_absent, "Backfilled absent entries");
        events.emit(LedgerEvent::Reconciled {
            staff_id: staff_id.to_string(),
            date,
            marked_absent,
        });
    }

    Ok(ReconcileOutcome {
        session_id: session.id,
        marked_absent,
    })
}

#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub staff_total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub marked_absent: i64,
}

/// One reconciliation pass over every staff member. Per-staff failures are
/// logged and counted, never allowed to abort the rest of the sweep; the
/// next nightly run retries them through the same idempotent algorithm.
pub async fn reconcile_all_staff(
    pool: &SqlitePool,
    events: &LedgerEvents,
    date: NaiveDate,
    parallelism: usize,
) -> AppResult<SweepSummary> {
    let staff_ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM staff")
        .fetch_all(pool)
        .await?;

    let mut summary = SweepSummary {
        staff_total: staff_ids.len(),
        ..SweepSummary::default()
    };

    let mut sweeps = futures::stream::iter(staff_ids.into_iter().map(|(staff_id,)| {
        let pool = pool.clone();
        let events = events.clone();
        async move {
            let outcome = reconcile_day(&pool, &events, &staff_id, date).await;
            (staff_id, outcome)
        }
    }))
    .buffer_unordered(parallelism.max(1));

    while let Some((staff_id, outcome)) = sweeps.next().await {
        match outcome {
            Ok(o) => {
                summary.succeeded += 1;
                summary.marked_absent += o.marked_absent;
            }
            Err(e) => {
                summary.failed += 1;
                error!(staff_id, %date, error = %e, "Reconciliation sweep failed for staff");
            }
        }
    }

    Ok(summary)
}
