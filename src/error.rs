use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Error taxonomy for the reconciliation core.
///
/// `NotFound` is fatal to the single call. `DuplicateMark` is a business-rule
/// rejection the kiosk recovers from. `Conflict` means a storage constraint
/// fired that the engine's own checks should have prevented.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(
        fmt = "Student has already checked in within the last {} minutes. Please wait before checking in again.",
        minutes
    )]
    DuplicateMark { minutes: i64 },

    #[display(fmt = "Storage constraint violated: {}", _0)]
    Conflict(String),

    #[display(fmt = "Attendance policy unavailable")]
    PolicyUnavailable,

    #[display(fmt = "Database error: {}", _0)]
    Database(sqlx::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Discriminator the kiosk switches on when rendering operator feedback.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DuplicateMark { .. } => "STUDENT_ALREADY_MARKED",
            Self::Conflict(_) => "CONFLICT",
            Self::PolicyUnavailable => "POLICY_UNAVAILABLE",
            Self::Database(_) => "INTERNAL",
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

/// Unexpected unique/check violations are a bug signal, not a user error.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateMark { .. } => StatusCode::CONFLICT,
            Self::Conflict(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PolicyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error",
                    "error_type": self.error_type(),
                }))
            }
            Self::Conflict(context) => {
                tracing::error!(context = %context, "Unexpected storage constraint violation");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error",
                    "error_type": self.error_type(),
                }))
            }
            other => HttpResponse::build(self.status_code()).json(json!({
                "message": other.to_string(),
                "error_type": other.error_type(),
            })),
        }
    }
}
