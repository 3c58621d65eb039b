//! Status-transition rows. Insert and read only; the schema rejects
//! updates and deletes.

use rusqlite::{Connection, Row, params};

use crate::errors::Result;
use crate::time::{format_ts, ts_column};
use crate::types::{HistoryFilter, HistoryRecord};

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        old_status: row.get("old_status")?,
        new_status: row.get("new_status")?,
        changed_at: ts_column(row, "changed_at")?,
    })
}

/// History repository.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Append one record.
    pub fn insert(conn: &Connection, record: &HistoryRecord) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO task_history (id, task_id, old_status, new_status, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.task_id,
                record.old_status,
                record.new_status,
                format_ts(record.changed_at),
            ],
        )?;
        Ok(())
    }

    /// Records for one task, oldest first. `date` matches the UTC day of
    /// `changed_at`.
    pub fn list(
        conn: &Connection,
        task_id: &str,
        filter: &HistoryFilter,
    ) -> Result<Vec<HistoryRecord>> {
        let date = filter.date.map(|d| d.format("%Y-%m-%d").to_string());
        let mut stmt = conn.prepare_cached(
            "SELECT id, task_id, old_status, new_status, changed_at
               FROM task_history
              WHERE task_id = ?1
                AND (?2 IS NULL OR old_status = ?2)
                AND (?3 IS NULL OR new_status = ?3)
                AND (?4 IS NULL OR substr(changed_at, 1, 10) = ?4)
              ORDER BY changed_at ASC, rowid ASC",
        )?;
        let records = stmt
            .query_map(
                params![task_id, filter.old_status, filter.new_status, date],
                record_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
