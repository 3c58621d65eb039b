//! Report preference rows.
//!
//! `claimed_until` is a dispatch lease: a claimed row is invisible to other
//! claimers until the lease expires or the claim is completed or released.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::time::{format_time_of_day, format_ts, opt_ts_column, parse_time_of_day, ts_column};
use crate::types::{ReportPreference, ReportPreferenceUpdate};

const PREF_COLUMNS: &str =
    "owner, confirmation, send_time, email, last_updated, created_at, updated_at";

fn pref_from_row(row: &Row<'_>) -> rusqlite::Result<ReportPreference> {
    let send_time: String = row.get("send_time")?;
    let send_time = parse_time_of_day(&send_time).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ReportPreference {
        owner: row.get("owner")?,
        confirmation: row.get("confirmation")?,
        send_time,
        email: row.get("email")?,
        last_updated: opt_ts_column(row, "last_updated")?,
        created_at: ts_column(row, "created_at")?,
        updated_at: ts_column(row, "updated_at")?,
    })
}

/// Report preference repository.
pub struct ReportRepo;

impl ReportRepo {
    /// Fetch the preference for `owner`.
    pub fn get(conn: &Connection, owner: &str) -> Result<Option<ReportPreference>> {
        let sql = format!("SELECT {PREF_COLUMNS} FROM report_preferences WHERE owner = ?1");
        Ok(conn.query_row(&sql, params![owner], pref_from_row).optional()?)
    }

    /// Fetch the preference for `owner`, inserting the default row first if
    /// none exists (opted out, midnight, no address, never sent).
    pub fn get_or_create(
        conn: &Connection,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<ReportPreference> {
        let now = format_ts(now);
        let _ = conn.execute(
            "INSERT OR IGNORE INTO report_preferences
                (owner, confirmation, send_time, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, ?3)",
            params![owner, format_time_of_day(NaiveTime::MIN), now],
        )?;
        let sql = format!("SELECT {PREF_COLUMNS} FROM report_preferences WHERE owner = ?1");
        Ok(conn.query_row(&sql, params![owner], pref_from_row)?)
    }

    /// Apply user-facing changes. The row must exist.
    pub fn update(
        conn: &Connection,
        owner: &str,
        update: &ReportPreferenceUpdate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let email = update
            .email
            .as_deref()
            .map(str::trim)
            .map(|e| if e.is_empty() { None } else { Some(e) });
        let _ = conn.execute(
            "UPDATE report_preferences
                SET confirmation = COALESCE(?2, confirmation),
                    send_time    = COALESCE(?3, send_time),
                    email        = CASE WHEN ?4 THEN ?5 ELSE email END,
                    updated_at   = ?6
              WHERE owner = ?1",
            params![
                owner,
                update.confirmation,
                update.send_time.map(format_time_of_day),
                email.is_some(),
                email.flatten(),
                format_ts(now),
            ],
        )?;
        Ok(())
    }

    /// Lease every due, unclaimed preference until `lease_until` and return
    /// them. Must run inside a write transaction.
    ///
    /// The query narrows candidates; [`ReportPreference::is_due`] decides.
    pub fn claim_due(
        conn: &Connection,
        now: DateTime<Utc>,
        interval: Duration,
        lease_until: DateTime<Utc>,
    ) -> Result<Vec<ReportPreference>> {
        let sql = format!(
            "SELECT {PREF_COLUMNS} FROM report_preferences
              WHERE confirmation = 1
                AND email IS NOT NULL AND email != ''
                AND last_updated IS NOT NULL AND last_updated <= ?1
                AND (claimed_until IS NULL OR claimed_until <= ?2)
              ORDER BY owner"
        );
        let candidates = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![format_ts(now - interval), format_ts(now)],
                    pref_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let due: Vec<ReportPreference> = candidates
            .into_iter()
            .filter(|pref| pref.is_due(now, interval))
            .collect();

        let mut claim =
            conn.prepare_cached("UPDATE report_preferences SET claimed_until = ?2 WHERE owner = ?1")?;
        let lease_until = format_ts(lease_until);
        for pref in &due {
            let _ = claim.execute(params![pref.owner, lease_until])?;
        }
        Ok(due)
    }

    /// Overwrite `last_updated` without touching the lease.
    pub fn stamp(conn: &Connection, owner: &str, last_updated: DateTime<Utc>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE report_preferences SET last_updated = ?2 WHERE owner = ?1",
            params![owner, format_ts(last_updated)],
        )?;
        Ok(())
    }

    /// Record a dispatch: set `last_updated` and drop the lease.
    pub fn complete(conn: &Connection, owner: &str, last_updated: DateTime<Utc>) -> Result<()> {
        let _ = conn.execute(
            "UPDATE report_preferences
                SET last_updated = ?2, claimed_until = NULL
              WHERE owner = ?1",
            params![owner, format_ts(last_updated)],
        )?;
        Ok(())
    }

    /// Drop the lease without recording a dispatch.
    pub fn release(conn: &Connection, owner: &str) -> Result<()> {
        let _ = conn.execute(
            "UPDATE report_preferences SET claimed_until = NULL WHERE owner = ?1",
            params![owner],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
