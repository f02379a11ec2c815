use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roster row. Owned by student management (external); read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Student {
    pub id: String,
    pub staff_id: String,
    pub name: String,
    #[schema(example = "2021-00042")]
    pub matric_no: String,
    #[schema(example = "Grade 11")]
    pub grade: String,
    #[schema(example = "BSIT-3A")]
    pub section: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Enrolled biometric template metadata. The core never interprets the
/// template blob; it only forwards it to the identity resolver.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FingerprintTemplate {
    pub id: String,
    pub student_id: String,
    pub finger_type: String,
    pub template: Vec<u8>,
}
