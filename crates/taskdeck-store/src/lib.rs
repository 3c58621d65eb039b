//! # taskdeck-store
//!
//! Per-owner task lists backed by `SQLite`.
//!
//! - **Priority re-sequencing** ([`priority`]): among an owner's active tasks
//!   no two share a priority. Taking an occupied slot ripples the contiguous
//!   run above it up by one.
//! - **History ledger** ([`ledger`]): every save that changes a task's status
//!   appends one immutable transition record.
//! - **Report preferences**: per-owner digest settings plus the due/claim
//!   queries the report worker polls.
//!
//! [`TaskStore`] is the entry point. It wraps an `r2d2` pool and serializes
//! writes per owner.

#![deny(unsafe_code)]

pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod priority;
pub mod sqlite;
pub mod store;
pub mod time;
pub mod types;

pub use errors::{Result, TaskError};
pub use priority::{PrioritySlot, plan_shift, validate_priority};
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use sqlite::migrations::run_migrations;
pub use store::TaskStore;
pub use types::*;
