use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Section label written on synthetic absent rows by the backfill sweep.
pub const AUTO_SECTION: &str = "AUTO";
/// Section label written on manual bulk marks when the caller gives none.
pub const MANUAL_SECTION: &str = "MANUAL";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MarkStatus {
    Present,
    Absent,
}

/// AM/PM half-day classification attached to a mark, independent of the
/// session's calendar date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum SessionType {
    Am,
    Pm,
}

/// One directional check event in the attendance ledger.
///
/// `created_at` is the authoritative event time. Lateness is never stored;
/// it is derived at read time against the staff policy.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": "8a13b9a0-22f1-4f02-bb4e-6a3f1f3f9b77",
    "student_id": "a1b2c3d4-0000-0000-0000-000000000002",
    "attendance_id": "2f4fd83e-7e55-4a32-9d5d-3fdc0a9b0f11",
    "time_type": "IN",
    "status": "present",
    "section": "BSIT-3A",
    "session_type": "AM",
    "created_at": "2024-03-01T07:42:10"
}))]
pub struct LedgerEntry {
    pub id: String,
    pub student_id: String,
    pub attendance_id: String,
    pub time_type: Direction,
    pub status: MarkStatus,
    pub section: String,
    pub session_type: Option<SessionType>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
