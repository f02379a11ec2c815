use crate::model::ledger::LedgerEntry;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;

/// Emitted after every successful ledger write. UI layers subscribe to this
/// instead of polling the ledger on a timer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    Marked {
        entry: LedgerEntry,
    },
    BulkMarked {
        attendance_id: String,
        inserted: i64,
    },
    Reconciled {
        staff_id: String,
        date: NaiveDate,
        marked_absent: i64,
    },
}

#[derive(Clone)]
pub struct LedgerEvents {
    tx: broadcast::Sender<LedgerEvent>,
}

impl LedgerEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Send errors only mean nobody is listening right now.
    pub fn emit(&self, event: LedgerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for LedgerEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
