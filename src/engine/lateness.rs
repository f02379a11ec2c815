use crate::error::AppResult;
use crate::model::ledger::{Direction, SessionType};
use crate::model::policy::AttendancePolicy;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use sqlx::SqlitePool;
use tracing::warn;

const DEFAULT_AM_LATE_TIME: &str = "07:30";
const DEFAULT_PM_LATE_TIME: &str = "12:50";

pub async fn fetch_policy(pool: &SqlitePool, staff_id: &str) -> AppResult<AttendancePolicy> {
    let policy = sqlx::query_as::<_, AttendancePolicy>(
        r#"
        SELECT school_start_time, grace_period_minutes, pm_boundary_hour,
               pm_late_cutoff_enabled, pm_late_cutoff_time
        FROM staff
        WHERE id = ?
        "#,
    )
    .bind(staff_id)
    .fetch_optional(pool)
    .await?;

    policy.ok_or(crate::error::AppError::PolicyUnavailable)
}

/// Policy failures never block attendance paths; they degrade to defaults.
pub async fn fetch_policy_or_default(pool: &SqlitePool, staff_id: &str) -> AttendancePolicy {
    match fetch_policy(pool, staff_id).await {
        Ok(policy) => policy,
        Err(e) => {
            warn!(staff_id, error = %e, "Attendance policy unavailable, using defaults");
            AttendancePolicy::default()
        }
    }
}

/// Tolerant "H:MM" / "HH:MM" / "hh:mm AM|PM" parser. Anything unparseable
/// falls back to 07:30 rather than failing the read.
fn parse_policy_time(input: Option<&str>) -> NaiveTime {
    let fallback = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
    let Some(raw) = input else { return fallback };

    let lower = raw.trim().to_ascii_lowercase();
    let (clock, meridiem) = if let Some(stripped) = lower.strip_suffix("am") {
        (stripped.trim_end(), Some("AM"))
    } else if let Some(stripped) = lower.strip_suffix("pm") {
        (stripped.trim_end(), Some("PM"))
    } else {
        (lower.as_str(), None)
    };

    let mut parts = clock.splitn(2, ':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return fallback;
    };
    let (Ok(mut hour), Ok(minute)) = (h.trim().parse::<u32>(), m.trim().parse::<u32>()) else {
        return fallback;
    };

    match meridiem {
        Some("PM") if hour < 12 => hour += 12,
        Some("AM") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(fallback)
}

fn late_threshold(
    occurred_at: NaiveDateTime,
    session_type: SessionType,
    policy: &AttendancePolicy,
) -> NaiveDateTime {
    let base = match session_type {
        SessionType::Am => parse_policy_time(Some(policy.school_start_time.as_str())),
        SessionType::Pm => {
            if policy.pm_late_cutoff_enabled && policy.pm_late_cutoff_time.is_some() {
                parse_policy_time(policy.pm_late_cutoff_time.as_deref())
            } else {
                parse_policy_time(Some(DEFAULT_PM_LATE_TIME))
            }
        }
    };

    occurred_at.date().and_time(base) + Duration::minutes(policy.grace_period_minutes)
}

/// Lateness is derived, never stored: only IN marks can be late, measured
/// against the policy threshold for the mark's AM/PM session type.
pub fn is_late_arrival(
    occurred_at: NaiveDateTime,
    session_type: Option<SessionType>,
    direction: Direction,
    policy: &AttendancePolicy,
) -> bool {
    if direction != Direction::In {
        return false;
    }
    let Some(session_type) = session_type else {
        return false;
    };

    occurred_at > late_threshold(occurred_at, session_type, policy)
}

/// AM/PM classification when the caller does not supply one.
pub fn default_session_type(occurred_at: NaiveDateTime, policy: &AttendancePolicy) -> SessionType {
    if i64::from(occurred_at.hour()) >= policy.pm_boundary_hour {
        SessionType::Pm
    } else {
        SessionType::Am
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parses_plain_and_meridiem_times() {
        assert_eq!(parse_policy_time(Some("7:30")), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(parse_policy_time(Some("07:30")), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(parse_policy_time(Some("1:05 PM")), NaiveTime::from_hms_opt(13, 5, 0).unwrap());
        assert_eq!(parse_policy_time(Some("12:10 AM")), NaiveTime::from_hms_opt(0, 10, 0).unwrap());
        assert_eq!(parse_policy_time(Some("nonsense")), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(parse_policy_time(None), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    }

    #[test]
    fn grace_period_shifts_the_threshold() {
        let policy = AttendancePolicy {
            school_start_time: "07:30".to_string(),
            grace_period_minutes: 15,
            ..AttendancePolicy::default()
        };

        assert!(!is_late_arrival(at(7, 44), Some(SessionType::Am), Direction::In, &policy));
        assert!(!is_late_arrival(at(7, 45), Some(SessionType::Am), Direction::In, &policy));
        assert!(is_late_arrival(at(7, 46), Some(SessionType::Am), Direction::In, &policy));
    }

    #[test]
    fn out_marks_are_never_late() {
        let policy = AttendancePolicy::default();
        assert!(!is_late_arrival(at(23, 59), Some(SessionType::Am), Direction::Out, &policy));
        assert!(!is_late_arrival(at(23, 59), None, Direction::In, &policy));
    }

    #[test]
    fn pm_cutoff_defaults_and_overrides() {
        let mut policy = AttendancePolicy {
            grace_period_minutes: 0,
            ..AttendancePolicy::default()
        };

        // default 12:50 cutoff
        assert!(!is_late_arrival(at(12, 50), Some(SessionType::Pm), Direction::In, &policy));
        assert!(is_late_arrival(at(12, 51), Some(SessionType::Pm), Direction::In, &policy));

        policy.pm_late_cutoff_enabled = true;
        policy.pm_late_cutoff_time = Some("13:30".to_string());
        assert!(!is_late_arrival(at(13, 30), Some(SessionType::Pm), Direction::In, &policy));
        assert!(is_late_arrival(at(13, 31), Some(SessionType::Pm), Direction::In, &policy));
    }

    #[test]
    fn session_type_defaults_on_boundary_hour() {
        let policy = AttendancePolicy::default();
        assert_eq!(default_session_type(at(11, 59), &policy), SessionType::Am);
        assert_eq!(default_session_type(at(12, 0), &policy), SessionType::Pm);
    }
}
