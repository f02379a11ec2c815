use crate::engine::backfill;
use crate::engine::events::LedgerEvents;
use chrono::{Days, Local};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{error, info};

/// Nightly absent-marking loop: one catch-up sweep at startup, then one
/// sweep just after every local midnight. Per-staff failures are isolated
/// inside the sweep; a failed night is retried by the next one through the
/// same idempotent algorithm.
pub async fn run(pool: SqlitePool, events: LedgerEvents, parallelism: usize) {
    sweep(&pool, &events, parallelism).await;

    loop {
        let now = Local::now().naive_local();
        let next_midnight = now
            .date()
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 1))
            .expect("date overflow");
        let wait = (next_midnight - now)
            .to_std()
            .unwrap_or(Duration::from_secs(60));

        tokio::time::sleep(wait).await;
        sweep(&pool, &events, parallelism).await;
    }
}

async fn sweep(pool: &SqlitePool, events: &LedgerEvents, parallelism: usize) {
    let today = Local::now().date_naive();
    info!(%today, "Running daily absent marking sweep");

    match backfill::reconcile_all_staff(pool, events, today, parallelism).await {
        Ok(summary) => info!(
            staff_total = summary.staff_total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            marked_absent = summary.marked_absent,
            "Daily absent marking completed"
        ),
        Err(e) => error!(error = %e, "Daily absent marking sweep failed"),
    }
}
