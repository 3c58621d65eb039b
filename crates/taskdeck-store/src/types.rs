//! Core types for the task store.
//!
//! Status is the single source of truth for completion: `completed` is a
//! derived flag that every write recomputes from `status`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Currently being worked on.
    InProgress,
    /// Done.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl TaskStatus {
    /// All statuses in digest order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// SQL string representation (matches the `CHECK` constraint values).
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse from the SQL representation (case-insensitive).
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether a task in this status counts as completed.
    #[must_use]
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_sql(s).ok_or_else(|| format!("unknown task status: {s}"))
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_sql()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Self::from_sql(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown task status: {raw}").into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain types
// ─────────────────────────────────────────────────────────────────────────────

/// A task owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique ID (prefixed: `task-{uuid}`).
    pub id: String,
    /// Opaque owner key supplied by the request layer.
    pub owner: String,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Position in the owner's list; unique among active tasks.
    pub priority: i64,
    /// Current status (authoritative).
    pub status: TaskStatus,
    /// Derived from `status`; kept for list filtering.
    pub completed: bool,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task participates in the priority-uniqueness scope.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.deleted && !self.completed
    }
}

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Unique ID (prefixed: `hist-{uuid}`).
    pub id: String,
    /// Task the transition belongs to.
    pub task_id: String,
    /// Status before the write.
    pub old_status: TaskStatus,
    /// Status after the write.
    pub new_status: TaskStatus,
    /// When the write happened.
    pub changed_at: DateTime<Utc>,
}

/// Per-user digest preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPreference {
    /// Owner key (one preference per owner).
    pub owner: String,
    /// Opt-in flag.
    pub confirmation: bool,
    /// Preferred UTC time of day for the digest.
    pub send_time: NaiveTime,
    /// Recipient address. Preferences without one are never due.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Last digest sent, aligned to `send_time`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last settings change.
    pub updated_at: DateTime<Utc>,
}

impl ReportPreference {
    /// Whether a digest should go out at `now` given the minimum `interval`.
    ///
    /// `last_updated` is stamped when the owner opts in, so an opted-in
    /// preference without one is never due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        if !self.confirmation || self.email.as_deref().is_none_or(str::is_empty) {
            return false;
        }
        self.last_updated.is_some_and(|last| now - last >= interval)
    }

    /// Most recent instant at or before `now` whose time of day is `send_time`.
    #[must_use]
    pub fn aligned_send_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = now.date_naive().and_time(self.send_time).and_utc();
        if candidate > now {
            candidate - Duration::days(1)
        } else {
            candidate
        }
    }

    /// `last_updated` to record after a dispatch at `now`.
    ///
    /// Normally the aligned send instant, so the window moves by whole days.
    /// When that instant is already a full `interval` old the preference
    /// would stay due, so `now` itself is recorded.
    #[must_use]
    pub fn sent_stamp(&self, now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
        let aligned = self.aligned_send_instant(now);
        if now - aligned >= interval { now } else { aligned }
    }

    /// `last_updated` to record when the owner opts in or moves `send_time`
    /// at `now`.
    ///
    /// The first digest then goes out at the next `send_time` slot, and a
    /// slot never falls less than one day after the previous send.
    #[must_use]
    pub fn realigned_stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let slot = self.aligned_send_instant(now);
        match self.last_updated {
            Some(last) if last > slot => {
                let at_or_before = self.aligned_send_instant(last);
                if at_or_before == last {
                    last
                } else {
                    at_or_before + Duration::days(1)
                }
            }
            _ => slot,
        }
    }
}

/// Per-status task counts over an owner's non-deleted tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// `PENDING` tasks.
    pub pending: u64,
    /// `IN_PROGRESS` tasks.
    pub in_progress: u64,
    /// `COMPLETED` tasks.
    pub completed: u64,
    /// `CANCELLED` tasks.
    pub cancelled: u64,
}

impl StatusCounts {
    /// Count for a single status.
    #[must_use]
    pub fn get(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }

    pub(crate) fn add(&mut self, status: TaskStatus, n: u64) {
        match status {
            TaskStatus::Pending => self.pending += n,
            TaskStatus::InProgress => self.in_progress += n,
            TaskStatus::Completed => self.completed += n,
            TaskStatus::Cancelled => self.cancelled += n,
        }
    }

    /// Sum over all statuses.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.completed + self.cancelled
    }
}

/// List-page counters over an owner's non-deleted tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    /// Tasks flagged completed.
    pub completed: u64,
    /// All non-deleted tasks.
    pub total: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameter types
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateParams {
    /// Short title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Desired priority (must be > 0).
    pub priority: i64,
    /// Initial status (default `PENDING`).
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Parameters for updating a task. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateParams {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New priority (must be > 0).
    pub priority: Option<i64>,
    /// New status. Wins over `completed` when both are set.
    pub status: Option<TaskStatus>,
    /// Completion alias: `true` completes, `false` reopens to `PENDING`.
    pub completed: Option<bool>,
}

/// Which tasks a list query returns. Deleted tasks are never listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskListFilter {
    /// Active tasks first, then completed ones.
    #[default]
    All,
    /// Active (not completed) tasks only.
    Pending,
    /// Completed tasks only.
    Completed,
}

/// Optional filters for history listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    /// Only transitions out of this status.
    pub old_status: Option<TaskStatus>,
    /// Only transitions into this status.
    pub new_status: Option<TaskStatus>,
    /// Only transitions on this UTC calendar day.
    pub date: Option<NaiveDate>,
}

/// Changes to a report preference. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPreferenceUpdate {
    /// Opt in or out of digests.
    pub confirmation: Option<bool>,
    /// Preferred UTC time of day.
    pub send_time: Option<NaiveTime>,
    /// Recipient address.
    pub email: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
