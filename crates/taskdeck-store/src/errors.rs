//! Error types for the task store.
//!
//! [`TaskError`] is returned by every repository and [`TaskStore`] method.
//! `NotFound` deliberately carries no hint of *why* a lookup failed: a task
//! owned by someone else, a soft-deleted task, and an unknown id all look
//! the same to the caller.
//!
//! [`TaskStore`]: crate::TaskStore

use thiserror::Error;

/// Failure of a task store operation.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Input rejected before touching the database.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown, soft-deleted, or owned by another user.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// `"task"` or `"report preference"`.
        entity: &'static str,
        /// Requested id.
        id: String,
    },

    /// Statement or transaction failure.
    #[error("task database: {0}")]
    Database(#[from] rusqlite::Error),

    /// No connection could be checked out.
    #[error("task database pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema could not be brought up to date.
    #[error("schema migration failed: {message}")]
    Migration {
        /// Failed step and cause.
        message: String,
    },

    /// A store lock was poisoned by a panicking holder.
    #[error("task store: {0}")]
    Internal(String),
}

impl TaskError {
    /// `NotFound` for task `id`.
    pub fn task_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.to_string(),
        }
    }

    /// Transient lock contention worth retrying.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result of a task store operation.
pub type Result<T> = std::result::Result<T, TaskError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
