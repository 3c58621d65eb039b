//! Embedded schema migrations.
//!
//! Each step is an SQL script applied atomically together with its row in
//! `schema_version`. Steps are append-only: never edit a shipped script, add
//! a new one.

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::errors::{Result, TaskError};

/// `(version, description, script)`, ascending by version.
const STEPS: &[(u32, &str, &str)] = &[(
    1,
    "tasks, status history, report preferences",
    include_str!("v001_schema.sql"),
)];

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    description TEXT    NOT NULL,
    applied_at  TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);";

fn migration_error(context: String, e: &rusqlite::Error) -> TaskError {
    TaskError::Migration {
        message: format!("{context}: {e}"),
    }
}

/// Bring the schema up to [`latest_version`]. Returns the number of steps run.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    conn.execute_batch(VERSION_TABLE)
        .map_err(|e| migration_error("create schema_version".into(), &e))?;

    let from = current_version(conn)?;
    let pending: Vec<_> = STEPS.iter().filter(|(v, _, _)| *v > from).collect();
    if pending.is_empty() {
        debug!(version = from, "schema up to date");
        return Ok(0);
    }

    for &&(version, description, script) in &pending {
        info!(version, description, "migrating schema");
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| migration_error(format!("v{version} begin"), &e))?;
        tx.execute_batch(script)
            .map_err(|e| migration_error(format!("v{version} ({description})"), &e))?;
        let _ = tx
            .execute(
                "INSERT INTO schema_version (version, description) VALUES (?1, ?2)",
                params![version, description],
            )
            .map_err(|e| migration_error(format!("v{version} record"), &e))?;
        tx.commit()
            .map_err(|e| migration_error(format!("v{version} commit"), &e))?;
    }

    #[allow(clippy::cast_possible_truncation)]
    let count = pending.len() as u32;
    info!(from, to = latest_version(), "schema migrated");
    Ok(count)
}

/// Version recorded in `schema_version`; 0 before the first migration.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row(
        "SELECT IFNULL(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| migration_error("read schema_version".into(), &e))
}

/// Newest version this build knows how to create.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(v, _, _)| *v)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
