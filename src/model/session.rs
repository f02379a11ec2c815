use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// How a session came to exist. The backfill reconciler synthesizes at most
/// one `auto` session per staff+date; staff may create any number of `named`
/// sessions on the same date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionKind {
    Auto,
    Named,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": "2f4fd83e-7e55-4a32-9d5d-3fdc0a9b0f11",
    "staff_id": "a1b2c3d4-0000-0000-0000-000000000001",
    "name": "Daily Attendance - 2024-03-01",
    "date": "2024-03-01",
    "kind": "auto",
    "created_at": "2024-03-01T00:00:00"
}))]
pub struct AttendanceSession {
    pub id: String,
    pub staff_id: String,
    pub name: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub kind: SessionKind,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
