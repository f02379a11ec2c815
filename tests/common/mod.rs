// Not every test binary uses every helper.
#![allow(dead_code)]

use bioattend::db;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Single-connection in-memory pool, so the whole test shares one database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");

    db::init_schema(&pool).await.expect("schema bootstrap");
    pool
}

pub async fn seed_staff(pool: &SqlitePool) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO staff (id, name, email) VALUES (?, 'Ms. Reyes', 'reyes@school.test')",
    )
    .bind(&id)
    .execute(pool)
    .await
    .expect("seed staff");
    id
}

pub async fn seed_student(
    pool: &SqlitePool,
    staff_id: &str,
    name: &str,
    grade: &str,
    section: &str,
) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO students (id, staff_id, name, matric_no, grade, section)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(staff_id)
    .bind(name)
    .bind(format!("M-{}", &id[..8]))
    .bind(grade)
    .bind(section)
    .execute(pool)
    .await
    .expect("seed student");
    id
}

pub async fn seed_fingerprint(pool: &SqlitePool, student_id: &str) {
    sqlx::query(
        "INSERT INTO fingerprints (id, student_id, finger_type, template) VALUES (?, ?, 'right_index', ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(student_id)
    .bind(vec![1u8, 2, 3, 4])
    .execute(pool)
    .await
    .expect("seed fingerprint");
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).expect("valid time")
}

pub async fn count_entries(pool: &SqlitePool, sql_where: &str, binds: &[&str]) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM student_attendances WHERE {sql_where}");
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for bind in binds {
        query = query.bind(*bind);
    }
    query.fetch_one(pool).await.expect("count")
}
