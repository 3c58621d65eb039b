//! Status-transition ledger.
//!
//! [`HistoryLedger::observe`] runs once per save, before the row is written:
//! it diffs the stored status against the incoming one and appends a record
//! when they differ. A failed lookup of the stored row means there is no
//! transition to record.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::errors::Result;
use crate::metrics::TASK_HISTORY_RECORDS_TOTAL;
use crate::sqlite::repositories::generate_id;
use crate::sqlite::repositories::history::HistoryRepo;
use crate::sqlite::repositories::task::TaskRepo;
use crate::types::{HistoryRecord, Task};

/// Appends status transitions.
pub struct HistoryLedger;

impl HistoryLedger {
    /// Record a transition if `incoming.status` differs from what is stored.
    pub fn observe(
        conn: &Connection,
        incoming: &Task,
        now: DateTime<Utc>,
    ) -> Result<Option<HistoryRecord>> {
        let stored = match TaskRepo::stored_status(conn, &incoming.id) {
            Ok(status) => status,
            Err(e) => {
                debug!(task_id = %incoming.id, error = %e, "no stored status, skipping history");
                return Ok(None);
            }
        };
        if stored == incoming.status {
            return Ok(None);
        }

        let record = HistoryRecord {
            id: generate_id("hist"),
            task_id: incoming.id.clone(),
            old_status: stored,
            new_status: incoming.status,
            changed_at: now,
        };
        HistoryRepo::insert(conn, &record)?;
        metrics::counter!(
            TASK_HISTORY_RECORDS_TOTAL,
            "new_status" => incoming.status.as_sql()
        )
        .increment(1);
        Ok(Some(record))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
