use crate::error::AppResult;
use crate::kiosk::resolver::RosterTemplate;
use crate::model::student::Student;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use moka::future::Cache;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time roster for one staff member: enrolled students plus their
/// template metadata, ready to forward to the identity resolver.
pub struct RosterSnapshot {
    students: HashMap<String, Student>,
    pub templates: Vec<RosterTemplate>,
}

impl RosterSnapshot {
    pub fn contains(&self, student_id: &str) -> bool {
        self.students.contains_key(student_id)
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.get(student_id)
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// TTL cache of roster snapshots keyed by staff id, so the kiosk scan path
/// does not rebuild the template list on every sample.
#[derive(Clone)]
pub struct RosterCache {
    pool: SqlitePool,
    cache: Cache<String, Arc<RosterSnapshot>>,
}

impl RosterCache {
    pub fn new(pool: SqlitePool, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(1024)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { pool, cache }
    }

    pub async fn snapshot(&self, staff_id: &str) -> AppResult<Arc<RosterSnapshot>> {
        if let Some(snapshot) = self.cache.get(staff_id).await {
            return Ok(snapshot);
        }

        let snapshot = Arc::new(self.load(staff_id).await?);
        self.cache
            .insert(staff_id.to_string(), snapshot.clone())
            .await;
        Ok(snapshot)
    }

    /// Enrollment changes call this so the next scan sees the new roster.
    pub async fn invalidate(&self, staff_id: &str) {
        self.cache.invalidate(staff_id).await;
    }

    async fn load(&self, staff_id: &str) -> AppResult<RosterSnapshot> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT id, staff_id, name, matric_no, grade, section, created_at FROM students WHERE staff_id = ?",
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        let rows: Vec<(String, String, Vec<u8>)> = sqlx::query_as(
            r#"
            SELECT f.student_id, f.finger_type, f.template
            FROM fingerprints f
            JOIN students s ON s.id = f.student_id
            WHERE s.staff_id = ?
            "#,
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        let templates = rows
            .into_iter()
            .map(|(student_id, finger_type, template)| RosterTemplate {
                student_id,
                finger_type,
                template: STANDARD.encode(template),
            })
            .collect();

        Ok(RosterSnapshot {
            students: students.into_iter().map(|s| (s.id.clone(), s)).collect(),
            templates,
        })
    }

    /// Prime snapshots for every staff member at startup.
    pub async fn warmup(&self) -> anyhow::Result<()> {
        let staff_ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM staff")
            .fetch_all(&self.pool)
            .await?;

        let mut total_students = 0usize;
        for (staff_id,) in &staff_ids {
            total_students += self.snapshot(staff_id).await?.len();
        }

        log::info!(
            "Roster cache warmup complete: {} students across {} staff",
            total_students,
            staff_ids.len()
        );

        Ok(())
    }
}
