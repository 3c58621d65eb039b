//! [`TaskStore`]: the operations request handlers and the report worker call.
//!
//! Every write runs in a `BEGIN IMMEDIATE` transaction. Task writes also hold
//! an in-process per-owner mutex so that the read-then-bump of priority
//! re-sequencing is serialized per owner. Report claims hold a separate
//! global mutex; the `claimed_until` lease covers other processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, instrument, warn};

use crate::errors::{Result, TaskError};
use crate::ledger::HistoryLedger;
use crate::metrics::{TASK_STORE_BUSY_RETRIES_TOTAL, TASKS_CREATED_TOTAL, TASKS_DELETED_TOTAL};
use crate::priority::{PriorityManager, validate_priority};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations::{current_version, run_migrations};
use crate::sqlite::repositories::generate_id;
use crate::sqlite::repositories::history::HistoryRepo;
use crate::sqlite::repositories::report::ReportRepo;
use crate::sqlite::repositories::task::TaskRepo;
use crate::types::{
    HistoryFilter, HistoryRecord, ReportPreference, ReportPreferenceUpdate, StatusCounts, Task,
    TaskCreateParams, TaskListFilter, TaskStatus, TaskSummary, TaskUpdateParams,
};

/// Task, history, and report-preference store over a `SQLite` pool.
pub struct TaskStore {
    pool: ConnectionPool,
    claim_lock: Mutex<()>,
    owner_write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl TaskStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            claim_lock: Mutex::new(()),
            owner_write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open (or create) a database file and bring its schema up to date.
    pub fn open_file(path: &str, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        let applied = run_migrations(&*pool.get()?)?;
        info!(path, applied, "task store opened");
        Ok(Self::new(pool))
    }

    /// Single-connection in-memory store with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let config = ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        };
        let pool = connection::new_in_memory(&config)?;
        let _ = run_migrations(&*pool.get()?)?;
        Ok(Self::new(pool))
    }

    /// Highest applied schema migration.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn()?;
        current_version(&conn)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Write serialization
    // ─────────────────────────────────────────────────────────────────────

    fn acquire_owner_write_lock(&self, owner: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .owner_write_locks
            .lock()
            .map_err(|_| TaskError::Internal("owner lock map poisoned".into()))?;

        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(owner).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(owner.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_owner_write_lock<T>(&self, owner: &str, f: impl FnMut() -> Result<T>) -> Result<T> {
        let owner_lock = self.acquire_owner_write_lock(owner)?;
        let _guard = owner_lock
            .lock()
            .map_err(|_| TaskError::Internal("owner write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    fn lock_claims(&self) -> Result<MutexGuard<'_, ()>> {
        self.claim_lock
            .lock()
            .map_err(|_| TaskError::Internal("report claim lock poisoned".into()))
    }

    /// Retry on `SQLITE_BUSY` / `SQLITE_LOCKED` with linear backoff and
    /// ±25% jitter.
    #[allow(clippy::unused_self)]
    fn retry_on_sqlite_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_busy() && attempts < Self::SQLITE_BUSY_MAX_RETRIES => {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    debug!(attempts, backoff_ms, "sqlite busy, retrying");
                    metrics::counter!(TASK_STORE_BUSY_RETRIES_TOTAL).increment(1);
                    std::thread::sleep(std::time::Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction on a fresh connection.
    fn immediate<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    /// Create a task, re-sequencing the owner's list so `priority` is free.
    #[instrument(skip(self, params), fields(priority = params.priority))]
    pub fn create_task(&self, owner: &str, params: &TaskCreateParams) -> Result<Task> {
        validate_priority(params.priority)?;
        let task = self.with_owner_write_lock(owner, || {
            self.immediate(|conn| {
                let now = Utc::now();
                let status = params.status.unwrap_or(TaskStatus::Pending);
                let task = Task {
                    id: generate_id("task"),
                    owner: owner.to_string(),
                    title: params.title.clone(),
                    description: params.description.clone(),
                    priority: params.priority,
                    status,
                    completed: status.is_completed(),
                    deleted: false,
                    created_at: now,
                    updated_at: now,
                };
                let _ = PriorityManager::assign_priority(conn, owner, task.priority, None, now)?;
                let _ = HistoryLedger::observe(conn, &task, now)?;
                TaskRepo::insert(conn, &task)?;
                Ok(task)
            })
        })?;
        metrics::counter!(TASKS_CREATED_TOTAL).increment(1);
        debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Apply a partial update.
    ///
    /// `NotFound` if the task is unknown, deleted, or owned by someone else.
    /// Re-sequences when the priority changes or the task re-enters the
    /// active set; records a history entry when the status changes.
    #[instrument(skip(self, params))]
    pub fn update_task(
        &self,
        task_id: &str,
        owner: &str,
        params: &TaskUpdateParams,
    ) -> Result<Task> {
        if let Some(priority) = params.priority {
            validate_priority(priority)?;
        }
        self.with_owner_write_lock(owner, || {
            self.immediate(|conn| {
                let current = TaskRepo::get_live(conn, task_id, owner)?
                    .ok_or_else(|| TaskError::task_not_found(task_id))?;
                let now = Utc::now();
                let next = apply_update(&current, params, now);

                let priority_changed = next.priority != current.priority;
                let reactivated = next.is_active() && !current.is_active();
                if priority_changed || reactivated {
                    let _ = PriorityManager::assign_priority(
                        conn,
                        owner,
                        next.priority,
                        Some(&next.id),
                        now,
                    )?;
                }
                let _ = HistoryLedger::observe(conn, &next, now)?;
                TaskRepo::save(conn, &next)?;
                Ok(next)
            })
        })
    }

    /// Soft-delete a task. Same `NotFound` rules as [`Self::update_task`].
    #[instrument(skip(self))]
    pub fn delete_task(&self, task_id: &str, owner: &str) -> Result<()> {
        self.with_owner_write_lock(owner, || {
            self.immediate(|conn| {
                if TaskRepo::get_live(conn, task_id, owner)?.is_none() {
                    return Err(TaskError::task_not_found(task_id));
                }
                TaskRepo::soft_delete(conn, task_id, Utc::now())
            })
        })?;
        metrics::counter!(TASKS_DELETED_TOTAL).increment(1);
        Ok(())
    }

    /// Fetch one non-deleted task owned by `owner`.
    pub fn get_task(&self, task_id: &str, owner: &str) -> Result<Task> {
        let conn = self.conn()?;
        TaskRepo::get_live(&conn, task_id, owner)?.ok_or_else(|| TaskError::task_not_found(task_id))
    }

    /// The owner's non-deleted tasks: active first, each group by priority.
    pub fn list_tasks(&self, owner: &str, filter: TaskListFilter) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        TaskRepo::list(&conn, owner, filter)
    }

    /// Completed and total counts over the owner's non-deleted tasks.
    pub fn task_summary(&self, owner: &str) -> Result<TaskSummary> {
        let conn = self.conn()?;
        TaskRepo::summary(&conn, owner)
    }

    /// Per-status counts over the owner's non-deleted tasks.
    pub fn status_counts(&self, owner: &str) -> Result<StatusCounts> {
        let conn = self.conn()?;
        TaskRepo::status_counts(&conn, owner)
    }

    // ─────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────

    /// Status transitions of a task, oldest first.
    ///
    /// Soft-deleted tasks keep their history. A task owned by someone else
    /// is reported as `NotFound`.
    pub fn list_history(
        &self,
        task_id: &str,
        owner: &str,
        filter: &HistoryFilter,
    ) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        if !TaskRepo::is_owned_by(&conn, task_id, owner)? {
            return Err(TaskError::task_not_found(task_id));
        }
        HistoryRepo::list(&conn, task_id, filter)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Report preferences
    // ─────────────────────────────────────────────────────────────────────

    /// The owner's report preference, created with defaults on first access.
    pub fn report_preference(&self, owner: &str) -> Result<ReportPreference> {
        self.with_owner_write_lock(owner, || {
            self.immediate(|conn| ReportRepo::get_or_create(conn, owner, Utc::now()))
        })
    }

    /// Change the owner's report settings.
    pub fn update_report_preference(
        &self,
        owner: &str,
        update: &ReportPreferenceUpdate,
    ) -> Result<ReportPreference> {
        self.update_report_preference_at(owner, update, Utc::now())
    }

    /// [`Self::update_report_preference`] as if the clock read `now`.
    ///
    /// Opting in, or moving `send_time` while opted in, re-stamps
    /// `last_updated` so the next digest waits for the next `send_time` slot.
    pub fn update_report_preference_at(
        &self,
        owner: &str,
        update: &ReportPreferenceUpdate,
        now: DateTime<Utc>,
    ) -> Result<ReportPreference> {
        let email = update.email.as_deref().map(str::trim).unwrap_or_default();
        if !email.is_empty() && !is_plausible_email(email) {
            return Err(TaskError::Validation(format!(
                "invalid email address: {email}"
            )));
        }
        self.with_owner_write_lock(owner, || {
            self.immediate(|conn| {
                let before = ReportRepo::get_or_create(conn, owner, now)?;
                ReportRepo::update(conn, owner, update, now)?;
                let mut after = ReportRepo::get(conn, owner)?.ok_or_else(|| TaskError::NotFound {
                    entity: "report preference",
                    id: owner.to_string(),
                })?;

                let opted_in = after.confirmation && !before.confirmation;
                let moved = after.confirmation && after.send_time != before.send_time;
                if opted_in || moved {
                    let stamp = after.realigned_stamp(now);
                    ReportRepo::stamp(conn, owner, stamp)?;
                    debug!(owner, %stamp, "report schedule realigned");
                    after.last_updated = Some(stamp);
                }
                Ok(after)
            })
        })
    }

    /// Lease every preference due at `now` and return them.
    ///
    /// Due: opted in, has an address, last sent (or opted in) at or before
    /// `now - interval`, and not under another live lease. Leased rows stay
    /// invisible to other claimers until `now + lease`.
    pub fn claim_due_reports(
        &self,
        now: DateTime<Utc>,
        interval: Duration,
        lease: Duration,
    ) -> Result<Vec<ReportPreference>> {
        let _guard = self.lock_claims()?;
        let claimed = self.retry_on_sqlite_busy(|| {
            self.immediate(|conn| ReportRepo::claim_due(conn, now, interval, now + lease))
        })?;
        if !claimed.is_empty() {
            debug!(count = claimed.len(), "claimed due reports");
        }
        Ok(claimed)
    }

    /// Mark a claimed preference as sent and return the recorded
    /// `last_updated` (see [`ReportPreference::sent_stamp`]).
    pub fn complete_report(
        &self,
        pref: &ReportPreference,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<DateTime<Utc>> {
        let stamp = pref.sent_stamp(now, interval);
        self.retry_on_sqlite_busy(|| {
            self.immediate(|conn| ReportRepo::complete(conn, &pref.owner, stamp))
        })?;
        Ok(stamp)
    }

    /// Drop a lease without marking the preference sent.
    pub fn release_report_claim(&self, owner: &str) -> Result<()> {
        self.retry_on_sqlite_busy(|| self.immediate(|conn| ReportRepo::release(conn, owner)))
            .inspect_err(|e| warn!(owner, error = %e, "failed to release report claim"))
    }
}

/// Build the post-update row. `status` wins over the `completed` alias;
/// `completed` is always re-derived from `status`.
fn apply_update(current: &Task, params: &TaskUpdateParams, now: DateTime<Utc>) -> Task {
    let mut next = current.clone();
    if let Some(title) = &params.title {
        next.title.clone_from(title);
    }
    if let Some(description) = &params.description {
        next.description.clone_from(description);
    }
    if let Some(priority) = params.priority {
        next.priority = priority;
    }
    if let Some(status) = params.status {
        next.status = status;
    } else if let Some(completed) = params.completed {
        if completed {
            next.status = TaskStatus::Completed;
        } else if current.status.is_completed() {
            next.status = TaskStatus::Pending;
        }
    }
    next.completed = next.status.is_completed();
    next.updated_at = now;
    next
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveTime, TimeZone};

    fn store() -> TaskStore {
        TaskStore::open_in_memory().unwrap()
    }

    fn create(store: &TaskStore, owner: &str, title: &str, priority: i64) -> Task {
        store
            .create_task(
                owner,
                &TaskCreateParams {
                    title: title.into(),
                    description: String::new(),
                    priority,
                    status: None,
                },
            )
            .unwrap()
    }

    fn priority_of(store: &TaskStore, owner: &str, id: &str) -> i64 {
        store.get_task(id, owner).unwrap().priority
    }

    #[test]
    fn schema_is_current() {
        let s = store();
        assert_eq!(
            s.schema_version().unwrap(),
            crate::sqlite::migrations::latest_version()
        );
    }

    #[test]
    fn create_defaults() {
        let s = store();
        let t = create(&s, "alice", "write tests", 1);
        assert!(t.id.starts_with("task-"));
        assert_eq!(t.status, TaskStatus::Pending);
        assert!(!t.completed);
        assert!(!t.deleted);
    }

    #[test]
    fn create_rejects_non_positive_priority() {
        let s = store();
        let err = s
            .create_task(
                "alice",
                &TaskCreateParams {
                    title: "x".into(),
                    description: String::new(),
                    priority: 0,
                    status: None,
                },
            )
            .unwrap_err();
        assert_matches!(err, TaskError::Validation(_));
        assert!(s.list_tasks("alice", TaskListFilter::All).unwrap().is_empty());
    }

    #[test]
    fn insert_into_full_run_shifts_everything_above() {
        let s = store();
        let ids: Vec<String> = (1..=4)
            .map(|p| create(&s, "alice", &format!("t{p}"), p).id)
            .collect();
        let new = create(&s, "alice", "new", 2);

        let got: Vec<i64> = ids.iter().map(|id| priority_of(&s, "alice", id)).collect();
        assert_eq!(got, [1, 3, 4, 5]);
        assert_eq!(new.priority, 2);
    }

    #[test]
    fn insert_stops_at_gap() {
        let s = store();
        let a = create(&s, "alice", "a", 1).id;
        let b = create(&s, "alice", "b", 2).id;
        let c = create(&s, "alice", "c", 4).id;
        create(&s, "alice", "new", 2);

        assert_eq!(priority_of(&s, "alice", &a), 1);
        assert_eq!(priority_of(&s, "alice", &b), 3);
        assert_eq!(priority_of(&s, "alice", &c), 4);
    }

    #[test]
    fn owners_do_not_interfere() {
        let s = store();
        let a = create(&s, "alice", "a", 1).id;
        create(&s, "bob", "b", 1);
        assert_eq!(priority_of(&s, "alice", &a), 1);
    }

    #[test]
    fn completed_tasks_are_outside_the_scope() {
        let s = store();
        let done = create(&s, "alice", "done", 1).id;
        s.update_task(&done, "alice", &TaskUpdateParams {
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();
        create(&s, "alice", "new", 1);
        assert_eq!(priority_of(&s, "alice", &done), 1);
    }

    #[test]
    fn update_priority_shifts_others_not_self() {
        let s = store();
        let a = create(&s, "alice", "a", 1).id;
        let b = create(&s, "alice", "b", 2).id;
        let c = create(&s, "alice", "c", 3).id;

        let moved = s
            .update_task(&c, "alice", &TaskUpdateParams {
                priority: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(moved.priority, 1);
        assert_eq!(priority_of(&s, "alice", &a), 2);
        assert_eq!(priority_of(&s, "alice", &b), 3);
    }

    #[test]
    fn update_same_priority_moves_nothing() {
        let s = store();
        let a = create(&s, "alice", "a", 1).id;
        let b = create(&s, "alice", "b", 2).id;
        s.update_task(&a, "alice", &TaskUpdateParams {
            priority: Some(1),
            title: Some("renamed".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(priority_of(&s, "alice", &a), 1);
        assert_eq!(priority_of(&s, "alice", &b), 2);
    }

    #[test]
    fn no_room_above_max_priority() {
        let s = store();
        let top = create(&s, "alice", "top", i64::MAX).id;
        let err = s
            .create_task("alice", &TaskCreateParams {
                title: "also top".into(),
                description: String::new(),
                priority: i64::MAX,
                status: None,
            })
            .unwrap_err();
        assert_matches!(err, TaskError::Validation(_));
        // Nothing was written.
        assert_eq!(priority_of(&s, "alice", &top), i64::MAX);
        assert_eq!(s.list_tasks("alice", TaskListFilter::All).unwrap().len(), 1);
    }

    #[test]
    fn reopening_reclaims_a_unique_slot() {
        let s = store();
        let a = create(&s, "alice", "a", 1).id;
        s.update_task(&a, "alice", &TaskUpdateParams {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        })
        .unwrap();
        let b = create(&s, "alice", "b", 1).id;

        let reopened = s
            .update_task(&a, "alice", &TaskUpdateParams {
                completed: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.priority, 1);
        assert_eq!(priority_of(&s, "alice", &b), 2);
    }

    #[test]
    fn status_change_records_one_history_entry() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        s.update_task(&t.id, "alice", &TaskUpdateParams {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        })
        .unwrap();

        let history = s.list_history(&t.id, "alice", &HistoryFilter::default()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_status, TaskStatus::Pending);
        assert_eq!(history[0].new_status, TaskStatus::InProgress);
    }

    #[test]
    fn title_only_update_records_nothing() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        s.update_task(&t.id, "alice", &TaskUpdateParams {
            title: Some("renamed".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(
            s.list_history(&t.id, "alice", &HistoryFilter::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn explicit_status_wins_over_completed_alias() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        let updated = s
            .update_task(&t.id, "alice", &TaskUpdateParams {
                status: Some(TaskStatus::Cancelled),
                completed: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Cancelled);
        assert!(!updated.completed);
    }

    #[test]
    fn completed_false_leaves_non_completed_status() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        s.update_task(&t.id, "alice", &TaskUpdateParams {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        })
        .unwrap();
        let updated = s
            .update_task(&t.id, "alice", &TaskUpdateParams {
                completed: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
    }

    #[test]
    fn foreign_and_deleted_tasks_are_not_found() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        let upd = TaskUpdateParams {
            title: Some("hijack".into()),
            ..Default::default()
        };
        assert_matches!(
            s.update_task(&t.id, "bob", &upd),
            Err(TaskError::NotFound { .. })
        );
        assert_matches!(s.delete_task(&t.id, "bob"), Err(TaskError::NotFound { .. }));
        assert_matches!(
            s.list_history(&t.id, "bob", &HistoryFilter::default()),
            Err(TaskError::NotFound { .. })
        );

        s.delete_task(&t.id, "alice").unwrap();
        assert_matches!(s.get_task(&t.id, "alice"), Err(TaskError::NotFound { .. }));
        assert_matches!(
            s.update_task(&t.id, "alice", &upd),
            Err(TaskError::NotFound { .. })
        );
        assert_matches!(s.delete_task(&t.id, "alice"), Err(TaskError::NotFound { .. }));
        assert_matches!(
            s.update_task("task-missing", "alice", &upd),
            Err(TaskError::NotFound { .. })
        );
    }

    #[test]
    fn deleted_task_frees_slot_and_keeps_history() {
        let s = store();
        let t = create(&s, "alice", "a", 1);
        s.update_task(&t.id, "alice", &TaskUpdateParams {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        })
        .unwrap();
        s.delete_task(&t.id, "alice").unwrap();

        let other = create(&s, "alice", "b", 1);
        assert_eq!(other.priority, 1);
        assert_eq!(s.list_tasks("alice", TaskListFilter::All).unwrap().len(), 1);

        let history = s.list_history(&t.id, "alice", &HistoryFilter::default()).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn counts_and_summary() {
        let s = store();
        for p in 1..=4 {
            create(&s, "alice", &format!("t{p}"), p);
        }
        let tasks = s.list_tasks("alice", TaskListFilter::All).unwrap();
        s.update_task(&tasks[0].id, "alice", &TaskUpdateParams {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        })
        .unwrap();
        s.update_task(&tasks[1].id, "alice", &TaskUpdateParams {
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();

        let counts = s.status_counts("alice").unwrap();
        assert_eq!(
            counts,
            StatusCounts { pending: 2, in_progress: 1, completed: 1, cancelled: 0 }
        );
        assert_eq!(
            s.task_summary("alice").unwrap(),
            TaskSummary { completed: 1, total: 4 }
        );
    }

    #[test]
    fn report_preference_lazy_defaults_and_update() {
        let s = store();
        let pref = s.report_preference("alice").unwrap();
        assert!(!pref.confirmation);
        assert_eq!(pref.send_time, NaiveTime::MIN);

        let updated = s
            .update_report_preference("alice", &ReportPreferenceUpdate {
                confirmation: Some(true),
                send_time: NaiveTime::from_hms_opt(8, 30, 0),
                email: Some("alice@example.com".into()),
            })
            .unwrap();
        assert!(updated.confirmation);
        assert_eq!(updated.email.as_deref(), Some("alice@example.com"));

        assert_matches!(
            s.update_report_preference("alice", &ReportPreferenceUpdate {
                email: Some("not-an-address".into()),
                ..Default::default()
            }),
            Err(TaskError::Validation(_))
        );
    }

    #[test]
    fn claim_complete_cycle() {
        let s = store();
        opt_in_at(&s, "alice", 9, Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 30).unwrap();
        let day = Duration::hours(24);
        let lease = Duration::minutes(5);

        let due = s.claim_due_reports(now, day, lease).unwrap();
        assert_eq!(due.len(), 1);
        assert!(s.claim_due_reports(now, day, lease).unwrap().is_empty());

        let sent_at = s.complete_report(&due[0], now, day).unwrap();
        assert_eq!(sent_at, Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap());

        let later = now + Duration::hours(23);
        assert!(s.claim_due_reports(later, day, lease).unwrap().is_empty());
        let next_day = now + Duration::hours(24);
        assert_eq!(s.claim_due_reports(next_day, day, lease).unwrap().len(), 1);
    }

    fn opt_in_at(s: &TaskStore, owner: &str, hour: u32, now: DateTime<Utc>) -> ReportPreference {
        s.update_report_preference_at(
            owner,
            &ReportPreferenceUpdate {
                confirmation: Some(true),
                send_time: NaiveTime::from_hms_opt(hour, 0, 0),
                email: Some(format!("{owner}@example.com")),
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn opt_in_waits_for_next_send_slot() {
        let s = store();
        let day = Duration::hours(24);
        let lease = Duration::minutes(5);
        let opted = opt_in_at(&s, "alice", 9, Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap());
        assert_eq!(
            opted.last_updated,
            Some(Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap())
        );

        let before_slot = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        assert!(s.claim_due_reports(before_slot, day, lease).unwrap().is_empty());

        let at_slot = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let due = s.claim_due_reports(at_slot, day, lease).unwrap();
        assert_eq!(due.len(), 1);
        s.complete_report(&due[0], at_slot, day).unwrap();
        assert!(s.claim_due_reports(at_slot + Duration::hours(1), day, lease).unwrap().is_empty());
    }

    #[test]
    fn moving_send_time_later_does_not_resend_same_day() {
        let s = store();
        let day = Duration::hours(24);
        let lease = Duration::minutes(5);
        opt_in_at(&s, "alice", 9, Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap());

        let nine = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let due = s.claim_due_reports(nine, day, lease).unwrap();
        s.complete_report(&due[0], nine, day).unwrap();

        let moved = s
            .update_report_preference_at(
                "alice",
                &ReportPreferenceUpdate {
                    send_time: NaiveTime::from_hms_opt(15, 0, 0),
                    ..Default::default()
                },
                Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(
            moved.last_updated,
            Some(Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap())
        );

        let three_pm = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        assert!(s.claim_due_reports(three_pm, day, lease).unwrap().is_empty());
        assert_eq!(s.claim_due_reports(three_pm + day, day, lease).unwrap().len(), 1);
    }

    #[test]
    fn changing_only_email_keeps_schedule() {
        let s = store();
        let opted = opt_in_at(&s, "alice", 9, Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap());
        let changed = s
            .update_report_preference_at(
                "alice",
                &ReportPreferenceUpdate {
                    email: Some("alice@work.example.com".into()),
                    ..Default::default()
                },
                Utc.with_ymd_and_hms(2026, 3, 10, 8, 30, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(changed.last_updated, opted.last_updated);
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("a@b.io"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.io"));
        assert!(!is_plausible_email("ab.io"));
    }
}
