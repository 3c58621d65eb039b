//! Priority re-sequencing.
//!
//! Among an owner's active tasks (not deleted, not completed) no two share a
//! priority. Taking a slot that is already held ripples the contiguous run
//! starting at that slot up by one; the first gap absorbs the shift and
//! everything above it stays put.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::metrics::TASK_PRIORITY_SHIFTS_TOTAL;
use crate::sqlite::repositories::task::TaskRepo;

/// A task id paired with its priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySlot {
    /// Task id.
    pub id: String,
    /// Priority value.
    pub priority: i64,
}

/// Reject non-positive priorities.
pub fn validate_priority(priority: i64) -> Result<()> {
    if priority <= 0 {
        return Err(TaskError::Validation(
            "priority must be greater than 0".into(),
        ));
    }
    Ok(())
}

/// Compute the bumps needed to free `desired`.
///
/// `run` must be sorted ascending by priority and hold only slots with
/// `priority >= desired`. Returns the slots that move, with their new
/// priorities, in scan order. Fails if a bump would pass `i64::MAX`.
pub fn plan_shift(desired: i64, run: &[PrioritySlot]) -> Result<Vec<PrioritySlot>> {
    let mut next = desired;
    let mut moved = Vec::new();
    for slot in run {
        if slot.priority == next {
            next = next.checked_add(1).ok_or_else(|| {
                TaskError::Validation(format!("no priority left above {}", slot.priority))
            })?;
            moved.push(PrioritySlot {
                id: slot.id.clone(),
                priority: next,
            });
        } else if slot.priority > next {
            break;
        }
    }
    Ok(moved)
}

/// Applies [`plan_shift`] against the database.
pub struct PriorityManager;

impl PriorityManager {
    /// Make `desired` free for the caller's task among `owner`'s active
    /// tasks, bumping whatever sits in the way.
    ///
    /// `exclude` names the task being updated so it never displaces itself.
    /// The caller's own row is not touched. Must run inside the caller's
    /// write transaction with the owner's write lock held. Returns the
    /// number of tasks moved.
    pub fn assign_priority(
        conn: &Connection,
        owner: &str,
        desired: i64,
        exclude: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        validate_priority(desired)?;
        let run = TaskRepo::active_from(conn, owner, desired, exclude)?;
        let moved = plan_shift(desired, &run)?;
        if moved.is_empty() {
            return Ok(0);
        }

        TaskRepo::set_priorities(conn, &moved, now)?;
        debug!(owner, desired, shifted = moved.len(), "re-sequenced priorities");
        metrics::counter!(TASK_PRIORITY_SHIFTS_TOTAL).increment(moved.len() as u64);
        Ok(moved.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn run(priorities: &[i64]) -> Vec<PrioritySlot> {
        priorities
            .iter()
            .enumerate()
            .map(|(i, &priority)| PrioritySlot {
                id: format!("task-{i}"),
                priority,
            })
            .collect()
    }

    fn new_priorities(desired: i64, priorities: &[i64]) -> Vec<i64> {
        let slots: Vec<PrioritySlot> = run(priorities)
            .into_iter()
            .filter(|s| s.priority >= desired)
            .collect();
        plan_shift(desired, &slots)
            .unwrap()
            .into_iter()
            .map(|s| s.priority)
            .collect()
    }

    #[test]
    fn ripples_full_run() {
        // [1,2,3,4] + new at 2 -> existing 2,3,4 become 3,4,5
        assert_eq!(new_priorities(2, &[1, 2, 3, 4]), [3, 4, 5]);
    }

    #[test]
    fn stops_at_first_gap() {
        // [1,2,4] + new at 2 -> only 2 moves to 3
        assert_eq!(new_priorities(2, &[1, 2, 4]), [3]);
    }

    #[test]
    fn free_slot_moves_nothing() {
        assert!(new_priorities(3, &[1, 2, 5]).is_empty());
        assert!(new_priorities(1, &[]).is_empty());
    }

    #[test]
    fn leaves_tasks_above_gap() {
        // [5,6,8,9] + new at 5 -> 5,6 move to 6,7; 8,9 untouched
        let slots = run(&[5, 6, 8, 9]);
        let moved = plan_shift(5, &slots).unwrap();
        assert_eq!(
            moved,
            vec![
                PrioritySlot { id: "task-0".into(), priority: 6 },
                PrioritySlot { id: "task-1".into(), priority: 7 },
            ]
        );
    }

    #[test]
    fn shift_past_max_priority_is_rejected() {
        let slots = run(&[i64::MAX - 1, i64::MAX]);
        assert_matches!(plan_shift(i64::MAX - 1, &slots), Err(TaskError::Validation(_)));
        // A run that ends below the ceiling still fits.
        let slots = run(&[i64::MAX - 1]);
        assert_eq!(
            plan_shift(i64::MAX - 1, &slots).unwrap()[0].priority,
            i64::MAX
        );
    }

    #[test]
    fn validate_rejects_non_positive() {
        assert_matches!(validate_priority(0), Err(TaskError::Validation(_)));
        assert_matches!(validate_priority(-3), Err(TaskError::Validation(_)));
        assert!(validate_priority(1).is_ok());
    }
}
