use crate::api::marks::{ManualMarkPayload, MarkPayload};
use crate::api::reports::{
    DailySummaryRow, LedgerReportResponse, LedgerReportRow, ReconcilePayload,
};
use crate::api::sessions::{
    CreateSession, PageQuery, RenameSession, SessionEntriesResponse, SessionEntryRow,
    SessionListResponse, SessionQuery,
};
use crate::engine::mark::ManualMarkOutcome;
use crate::kiosk::orchestrator::{Phase, ScanOutcome, ScanRejection, ScanRequest};
use crate::kiosk::resolver::ProbeSample;
use crate::model::ledger::{Direction, LedgerEntry, MarkStatus, SessionType};
use crate::model::session::{AttendanceSession, SessionKind};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biometric Attendance API",
        version = "1.0.0",
        description = r#"
## School Attendance Reconciliation Service

Turns biometric identification events and manual interventions into a
consistent, idempotent attendance ledger.

### Key Features
- **Session Registry**
  - Daily auto sessions (one per staff per date) plus named sessions
- **Mark Engine**
  - Duplicate-suppression window, absent-to-present promotion, bulk manual marking
- **Backfill Reconciler**
  - Nightly and on-demand absent marking for unmarked students
- **Kiosk Identification**
  - Fingerprint scan orchestration against the external match service
- **Reports**
  - Reconciled ledger reads with policy-driven lateness annotation

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints
- `GET /api/v1/events` streams ledger changes as Server-Sent Events

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::sessions::create_session,
        crate::api::sessions::list_sessions,
        crate::api::sessions::get_session,
        crate::api::sessions::rename_session,
        crate::api::sessions::delete_session,
        crate::api::sessions::list_session_entries,

        crate::api::marks::mark_attendance,
        crate::api::marks::manual_mark,

        crate::api::reports::reconcile_now,
        crate::api::reports::ledger_report,
        crate::api::reports::daily_summary,

        crate::api::kiosk::scan,
        crate::api::kiosk::terminal_phase,
        crate::api::kiosk::refresh_roster,

        crate::api::events::stream
    ),
    components(
        schemas(
            AttendanceSession,
            SessionKind,
            LedgerEntry,
            Direction,
            MarkStatus,
            SessionType,
            CreateSession,
            SessionQuery,
            SessionListResponse,
            RenameSession,
            SessionEntryRow,
            SessionEntriesResponse,
            PageQuery,
            MarkPayload,
            ManualMarkPayload,
            ManualMarkOutcome,
            ReconcilePayload,
            LedgerReportRow,
            LedgerReportResponse,
            DailySummaryRow,
            ScanRequest,
            ScanOutcome,
            ScanRejection,
            ProbeSample,
            Phase
        )
    ),
    tags(
        (name = "Sessions", description = "Attendance session registry APIs"),
        (name = "Marks", description = "Mark engine APIs"),
        (name = "Reports", description = "Reconciled ledger read APIs"),
        (name = "Kiosk", description = "Fingerprint identification APIs"),
        (name = "Events", description = "Ledger change stream"),
    )
)]
pub struct ApiDoc;
