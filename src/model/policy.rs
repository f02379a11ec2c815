use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-staff attendance policy, stored on the staff row and mutated by staff
/// settings management (external). Input to lateness computation and AM/PM
/// session-type defaulting only; never a gate on recording presence.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendancePolicy {
    #[schema(example = "07:30")]
    pub school_start_time: String,
    #[schema(example = 15)]
    pub grace_period_minutes: i64,
    /// Hour of day (0-23) at which marks start counting as PM.
    #[schema(example = 12)]
    pub pm_boundary_hour: i64,
    pub pm_late_cutoff_enabled: bool,
    #[schema(example = "12:50", nullable = true)]
    pub pm_late_cutoff_time: Option<String>,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            school_start_time: "07:30".to_string(),
            grace_period_minutes: 15,
            pm_boundary_hour: 12,
            pm_late_cutoff_enabled: false,
            pm_late_cutoff_time: None,
        }
    }
}
