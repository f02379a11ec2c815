use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn init_db(database_url: &str) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .expect("Failed to connect to database");

    init_schema(&pool)
        .await
        .expect("Failed to initialize database schema");

    pool
}

/// Idempotent schema bootstrap. Also used by tests against in-memory pools.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    // Attendance policy lives on the staff row; staff settings management
    // (external) mutates it, this service only reads it.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id                      TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            email                   TEXT NOT NULL,
            school_start_time       TEXT NOT NULL DEFAULT '07:30',
            grace_period_minutes    INTEGER NOT NULL DEFAULT 15,
            pm_boundary_hour        INTEGER NOT NULL DEFAULT 12,
            pm_late_cutoff_enabled  INTEGER NOT NULL DEFAULT 0,
            pm_late_cutoff_time     TEXT,
            created_at              TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id         TEXT PRIMARY KEY,
            staff_id   TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
            name       TEXT NOT NULL,
            matric_no  TEXT NOT NULL,
            grade      TEXT NOT NULL,
            section    TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_staff ON students(staff_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fingerprints (
            id          TEXT PRIMARY KEY,
            student_id  TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            finger_type TEXT NOT NULL,
            template    BLOB NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendances (
            id         TEXT PRIMARY KEY,
            staff_id   TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
            name       TEXT NOT NULL,
            date       TEXT NOT NULL,
            kind       TEXT NOT NULL DEFAULT 'named',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Exactly one auto session per staff+date; named sessions are unlimited.
    // Concurrent first-scan-of-the-day races resolve on this index.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_attendances_auto_daily
        ON attendances(staff_id, date) WHERE kind = 'auto'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_attendances (
            id            TEXT PRIMARY KEY,
            student_id    TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            attendance_id TEXT NOT NULL REFERENCES attendances(id) ON DELETE CASCADE,
            time_type     TEXT NOT NULL,
            status        TEXT NOT NULL,
            section       TEXT NOT NULL,
            session_type  TEXT,
            created_at    TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Backs the duplicate-suppression window query.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_ledger_slot
        ON student_attendances(student_id, attendance_id, time_type, created_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ledger_session ON student_attendances(attendance_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
