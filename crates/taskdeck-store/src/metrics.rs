//! Metric names emitted by the task store.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

/// Tasks moved by priority re-sequencing (counter).
pub const TASK_PRIORITY_SHIFTS_TOTAL: &str = "task_priority_shifts_total";
/// Status transitions appended to the history ledger (counter, label: `new_status`).
pub const TASK_HISTORY_RECORDS_TOTAL: &str = "task_history_records_total";
/// Store writes retried after `SQLITE_BUSY` (counter).
pub const TASK_STORE_BUSY_RETRIES_TOTAL: &str = "task_store_busy_retries_total";
/// Tasks created (counter).
pub const TASKS_CREATED_TOTAL: &str = "tasks_created_total";
/// Tasks soft-deleted (counter).
pub const TASKS_DELETED_TOTAL: &str = "tasks_deleted_total";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_snake_case() {
        for name in [
            TASK_PRIORITY_SHIFTS_TOTAL,
            TASK_HISTORY_RECORDS_TOTAL,
            TASK_STORE_BUSY_RETRIES_TOTAL,
            TASKS_CREATED_TOTAL,
            TASKS_DELETED_TOTAL,
        ] {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
