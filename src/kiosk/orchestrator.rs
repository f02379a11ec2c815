use crate::engine::events::LedgerEvents;
use crate::engine::mark::{self, MarkRequest};
use crate::error::AppResult;
use crate::kiosk::resolver::{IdentityResolver, ProbeSample};
use crate::kiosk::roster::RosterCache;
use crate::model::ledger::{Direction, LedgerEntry, SessionType};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use utoipa::ToSchema;

/// Identification flow states. `Identifying` is the only suspend point;
/// terminal states settle back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Scanning,
    Identifying,
    Success,
    Error,
}

/// One physical scanner: one in-flight identification at a time. A newer
/// sample bumps the attempt counter, superseding whatever is in flight.
struct TerminalState {
    phase: Mutex<Phase>,
    attempts: AtomicU64,
}

impl TerminalState {
    fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
            attempts: AtomicU64::new(0),
        }
    }

    fn set(&self, phase: Phase) {
        *self.phase.lock().unwrap() = phase;
    }

    fn get(&self) -> Phase {
        *self.phase.lock().unwrap()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScanRequest {
    pub terminal_id: String,
    pub staff_id: String,
    pub attendance_id: String,
    pub time_type: Direction,
    pub session_type: Option<SessionType>,
    pub probe: ProbeSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanRejection {
    NotRecognized,
    LowConfidence,
    UnknownStudent,
    ResolverUnavailable,
}

/// Structured outcome for the kiosk operator. Mark-engine rejections
/// (duplicates, bad ids) propagate as errors instead; identification
/// failures are ordinary outcomes the operator retries.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ScanOutcome {
    Marked {
        student_id: String,
        student_name: String,
        confidence: f32,
        finger_type: Option<String>,
        entry: LedgerEntry,
    },
    Rejected {
        reason: ScanRejection,
        message: String,
    },
    /// A newer sample arrived while this one was identifying; its result is
    /// discarded, never merged into state.
    Superseded,
}

pub struct Kiosk<R> {
    resolver: R,
    roster: RosterCache,
    confidence_threshold: f32,
    continuous_mode: bool,
    auto_confirm: Duration,
    window_minutes: i64,
    terminals: Mutex<HashMap<String, Arc<TerminalState>>>,
}

impl<R: IdentityResolver> Kiosk<R> {
    pub fn new(
        resolver: R,
        roster: RosterCache,
        confidence_threshold: f32,
        continuous_mode: bool,
        auto_confirm: Duration,
        window_minutes: i64,
    ) -> Self {
        Self {
            resolver,
            roster,
            confidence_threshold,
            continuous_mode,
            auto_confirm,
            window_minutes,
            terminals: Mutex::new(HashMap::new()),
        }
    }

    fn terminal(&self, terminal_id: &str) -> Arc<TerminalState> {
        self.terminals
            .lock()
            .unwrap()
            .entry(terminal_id.to_string())
            .or_insert_with(|| Arc::new(TerminalState::new()))
            .clone()
    }

    pub fn phase(&self, terminal_id: &str) -> Phase {
        self.terminal(terminal_id).get()
    }

    /// Drive one sample through Idle → Scanning → Identifying → {Success,
    /// Error} → Idle. Every sample yields an explicit outcome.
    pub async fn process_scan(
        &self,
        pool: &SqlitePool,
        events: &LedgerEvents,
        req: ScanRequest,
    ) -> AppResult<ScanOutcome> {
        let terminal = self.terminal(&req.terminal_id);
        let attempt = terminal.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        terminal.set(Phase::Scanning);
        terminal.set(Phase::Identifying);

        let roster = match self.roster.snapshot(&req.staff_id).await {
            Ok(roster) => roster,
            Err(e) => {
                terminal.set(Phase::Idle);
                return Err(e);
            }
        };

        let resolved = self.resolver.identify(&req.probe, &roster.templates).await;

        if terminal.attempts.load(Ordering::SeqCst) != attempt {
            return Ok(ScanOutcome::Superseded);
        }

        let candidate = match resolved {
            Err(e) => {
                warn!(terminal_id = %req.terminal_id, error = %e, "Identification failed");
                return Ok(self.reject(
                    &terminal,
                    ScanRejection::ResolverUnavailable,
                    "Could not reach the identification service. Try again.",
                ));
            }
            Ok(outcome) => outcome,
        };

        let student_id = match candidate.student_id {
            None => {
                return Ok(self.reject(
                    &terminal,
                    ScanRejection::NotRecognized,
                    "Not recognized, try again.",
                ));
            }
            Some(id) => id,
        };

        if candidate.confidence < self.confidence_threshold {
            return Ok(self.reject(
                &terminal,
                ScanRejection::LowConfidence,
                "Not recognized, try again.",
            ));
        }

        // Resolver and roster disagreeing on enrollment is a consistency
        // mismatch, surfaced to the operator rather than marked.
        let student = match roster.student(&student_id) {
            None => {
                return Ok(self.reject(
                    &terminal,
                    ScanRejection::UnknownStudent,
                    "Identified student is not on the current roster.",
                ));
            }
            Some(student) => student.clone(),
        };

        terminal.set(Phase::Success);

        if self.continuous_mode && !self.auto_confirm.is_zero() {
            tokio::time::sleep(self.auto_confirm).await;
            if terminal.attempts.load(Ordering::SeqCst) != attempt {
                terminal.set(Phase::Idle);
                return Ok(ScanOutcome::Superseded);
            }
        }

        let marked = mark::mark_attendance(
            pool,
            events,
            self.window_minutes,
            MarkRequest {
                attendance_id: req.attendance_id,
                student_id: student_id.clone(),
                time_type: req.time_type,
                status: None,
                session_type: req.session_type,
                section: None,
                occurred_at: None,
            },
        )
        .await;

        match marked {
            Ok(entry) => {
                terminal.set(Phase::Idle);
                Ok(ScanOutcome::Marked {
                    student_id,
                    student_name: student.name,
                    confidence: candidate.confidence,
                    finger_type: candidate.finger_type,
                    entry,
                })
            }
            Err(e) => {
                terminal.set(Phase::Error);
                terminal.set(Phase::Idle);
                Err(e)
            }
        }
    }

    fn reject(
        &self,
        terminal: &TerminalState,
        reason: ScanRejection,
        message: &str,
    ) -> ScanOutcome {
        terminal.set(Phase::Error);
        terminal.set(Phase::Idle);
        ScanOutcome::Rejected {
            reason,
            message: message.to_string(),
        }
    }
}
