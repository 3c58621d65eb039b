//! Command-line surface over the task store.
//!
//! Handlers return JSON values; `main` prints them.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use clap::{Subcommand, ValueEnum};
use serde_json::{Value, json};
use taskdeck_store::time::parse_time_of_day;
use taskdeck_store::{
    HistoryFilter, ReportPreferenceUpdate, TaskCreateParams, TaskListFilter, TaskStatus,
    TaskStore, TaskUpdateParams,
};

/// Task subcommands.
#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Create a task. Occupied priorities are shifted up.
    Add {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(long, default_value = "")]
        description: String,
        /// Position in the list (1 = top).
        #[arg(long)]
        priority: i64,
        /// Initial status (PENDING, IN_PROGRESS, COMPLETED, CANCELLED).
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// List tasks.
    List {
        /// Which tasks to show.
        #[arg(long, value_enum, default_value_t = ListFilter::All)]
        filter: ListFilter,
    },
    /// Show one task.
    Show {
        /// Task id.
        id: String,
    },
    /// Change a task.
    Update {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New priority.
        #[arg(long)]
        priority: Option<i64>,
        /// New status.
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Mark completed (`true`) or reopen (`false`).
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Soft-delete a task.
    Delete {
        /// Task id.
        id: String,
    },
    /// Show a task's status transitions.
    History {
        /// Task id.
        id: String,
        /// Only transitions out of this status.
        #[arg(long)]
        old_status: Option<TaskStatus>,
        /// Only transitions into this status.
        #[arg(long)]
        new_status: Option<TaskStatus>,
        /// Only transitions on this UTC day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completed and total task counts.
    Summary,
}

/// Report-preference subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportAction {
    /// Show the digest preference.
    Show,
    /// Change the digest preference.
    Set {
        /// Opt in (`true`) or out (`false`).
        #[arg(long)]
        confirmation: Option<bool>,
        /// UTC time of day to send (HH:MM or HH:MM:SS).
        #[arg(long, value_parser = parse_send_time)]
        send_time: Option<NaiveTime>,
        /// Recipient address; empty clears it.
        #[arg(long)]
        email: Option<String>,
    },
}

/// `task list --filter` values.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListFilter {
    /// Active then completed.
    All,
    /// Not completed.
    Pending,
    /// Completed only.
    Completed,
}

impl From<ListFilter> for TaskListFilter {
    fn from(f: ListFilter) -> Self {
        match f {
            ListFilter::All => Self::All,
            ListFilter::Pending => Self::Pending,
            ListFilter::Completed => Self::Completed,
        }
    }
}

fn parse_send_time(raw: &str) -> std::result::Result<NaiveTime, String> {
    parse_time_of_day(raw).map_err(|e| format!("expected HH:MM[:SS]: {e}"))
}

/// Run a task subcommand for `owner`.
pub fn run_task(store: &TaskStore, owner: &str, action: TaskAction) -> Result<Value> {
    let out = match action {
        TaskAction::Add {
            title,
            description,
            priority,
            status,
        } => {
            let task = store.create_task(
                owner,
                &TaskCreateParams {
                    title,
                    description,
                    priority,
                    status,
                },
            )?;
            serde_json::to_value(task)?
        }
        TaskAction::List { filter } => serde_json::to_value(store.list_tasks(owner, filter.into())?)?,
        TaskAction::Show { id } => serde_json::to_value(store.get_task(&id, owner)?)?,
        TaskAction::Update {
            id,
            title,
            description,
            priority,
            status,
            completed,
        } => {
            let task = store.update_task(
                &id,
                owner,
                &TaskUpdateParams {
                    title,
                    description,
                    priority,
                    status,
                    completed,
                },
            )?;
            serde_json::to_value(task)?
        }
        TaskAction::Delete { id } => {
            store.delete_task(&id, owner)?;
            json!({ "deleted": id })
        }
        TaskAction::History {
            id,
            old_status,
            new_status,
            date,
        } => {
            let filter = HistoryFilter {
                old_status,
                new_status,
                date,
            };
            serde_json::to_value(store.list_history(&id, owner, &filter)?)?
        }
        TaskAction::Summary => serde_json::to_value(store.task_summary(owner)?)?,
    };
    Ok(out)
}

/// Run a report subcommand for `owner`.
pub fn run_report(store: &TaskStore, owner: &str, action: ReportAction) -> Result<Value> {
    let pref = match action {
        ReportAction::Show => store.report_preference(owner)?,
        ReportAction::Set {
            confirmation,
            send_time,
            email,
        } => store.update_report_preference(
            owner,
            &ReportPreferenceUpdate {
                confirmation,
                send_time,
                email,
            },
        )?,
    };
    Ok(serde_json::to_value(pref)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
