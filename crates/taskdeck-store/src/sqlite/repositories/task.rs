//! Task rows.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::priority::PrioritySlot;
use crate::time::{format_ts, ts_column};
use crate::types::{StatusCounts, Task, TaskListFilter, TaskStatus, TaskSummary};

const TASK_COLUMNS: &str =
    "id, owner, title, description, priority, status, completed, deleted, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        owner: row.get("owner")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        completed: row.get("completed")?,
        deleted: row.get("deleted")?,
        created_at: ts_column(row, "created_at")?,
        updated_at: ts_column(row, "updated_at")?,
    })
}

/// Task repository.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a fully-formed task row.
    pub fn insert(conn: &Connection, task: &Task) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO tasks (id, owner, title, description, priority, status,
                                completed, deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                task.id,
                task.owner,
                task.title,
                task.description,
                task.priority,
                task.status,
                task.completed,
                task.deleted,
                format_ts(task.created_at),
                format_ts(task.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    pub fn save(conn: &Connection, task: &Task) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks
                SET title = ?2, description = ?3, priority = ?4, status = ?5,
                    completed = ?6, deleted = ?7, updated_at = ?8
              WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.priority,
                task.status,
                task.completed,
                task.deleted,
                format_ts(task.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Look up a task by id regardless of owner or deletion.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], task_from_row).optional()?)
    }

    /// Look up a non-deleted task owned by `owner`.
    pub fn get_live(conn: &Connection, id: &str, owner: &str) -> Result<Option<Task>> {
        let sql =
            format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner = ?2 AND deleted = 0");
        Ok(conn
            .query_row(&sql, params![id, owner], task_from_row)
            .optional()?)
    }

    /// Whether `owner` owns task `id`, deleted or not.
    pub fn is_owned_by(conn: &Connection, id: &str, owner: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM tasks WHERE id = ?1 AND owner = ?2",
                params![id, owner],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Currently stored status. `QueryReturnedNoRows` if the row is absent.
    pub fn stored_status(conn: &Connection, id: &str) -> Result<TaskStatus> {
        Ok(conn.query_row(
            "SELECT status FROM tasks WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?)
    }

    /// Active tasks of `owner` with `priority >= from`, ascending.
    ///
    /// Ties (only possible in legacy data) break on creation order.
    pub fn active_from(
        conn: &Connection,
        owner: &str,
        from: i64,
        exclude: Option<&str>,
    ) -> Result<Vec<PrioritySlot>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, priority FROM tasks
              WHERE owner = ?1 AND deleted = 0 AND completed = 0
                AND priority >= ?2 AND (?3 IS NULL OR id != ?3)
              ORDER BY priority ASC, created_at ASC, id ASC",
        )?;
        let slots = stmt
            .query_map(params![owner, from, exclude], |row| {
                Ok(PrioritySlot {
                    id: row.get(0)?,
                    priority: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(slots)
    }

    /// Write new priorities for a batch of tasks.
    pub fn set_priorities(
        conn: &Connection,
        slots: &[PrioritySlot],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if slots.is_empty() {
            return Ok(());
        }
        let now = format_ts(now);
        let mut stmt =
            conn.prepare_cached("UPDATE tasks SET priority = ?2, updated_at = ?3 WHERE id = ?1")?;
        for slot in slots {
            let _ = stmt.execute(params![slot.id, slot.priority, now])?;
        }
        Ok(())
    }

    /// Mark a task deleted.
    pub fn soft_delete(conn: &Connection, id: &str, now: DateTime<Utc>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE tasks SET deleted = 1, updated_at = ?2 WHERE id = ?1",
            params![id, format_ts(now)],
        )?;
        Ok(())
    }

    /// Non-deleted tasks of `owner`. Active tasks come first, each group in
    /// priority order.
    pub fn list(conn: &Connection, owner: &str, filter: TaskListFilter) -> Result<Vec<Task>> {
        let completed_clause = match filter {
            TaskListFilter::All => "",
            TaskListFilter::Pending => " AND completed = 0",
            TaskListFilter::Completed => " AND completed = 1",
        };
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
              WHERE owner = ?1 AND deleted = 0{completed_clause}
              ORDER BY completed ASC, priority ASC, created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![owner], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Completed and total counts over the owner's non-deleted tasks.
    pub fn summary(conn: &Connection, owner: &str) -> Result<TaskSummary> {
        let (completed, total): (i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(completed), 0), COUNT(*)
               FROM tasks WHERE owner = ?1 AND deleted = 0",
            params![owner],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TaskSummary {
            completed: u64::try_from(completed).unwrap_or(0),
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Per-status counts over the owner's non-deleted tasks.
    pub fn status_counts(conn: &Connection, owner: &str) -> Result<StatusCounts> {
        let mut stmt = conn.prepare_cached(
            "SELECT status, COUNT(*) FROM tasks
              WHERE owner = ?1 AND deleted = 0
              GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![owner], |row| {
                Ok((row.get::<_, TaskStatus>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.add(status, u64::try_from(n).unwrap_or(0));
        }
        Ok(counts)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
