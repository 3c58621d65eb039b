//! Timestamp encoding for `SQLite` text columns.
//!
//! Instants are stored as RFC 3339 with microsecond precision and a `Z`
//! suffix so lexical order matches chronological order and
//! `substr(col, 1, 10)` yields the UTC calendar date.

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};

/// Format an instant for storage.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored instant.
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Format a time of day for storage (`HH:MM:SS`).
pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

/// Parse a stored time of day. Accepts `HH:MM` as well.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
}

/// Read a timestamp column, mapping parse failures into a rusqlite error.
pub(crate) fn ts_column(row: &rusqlite::Row<'_>, idx: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a nullable timestamp column.
pub(crate) fn opt_ts_column(
    row: &rusqlite::Row<'_>,
    idx: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse_ts(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_sortable_utc() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 9, 5, 0).unwrap();
        assert_eq!(format_ts(ts), "2026-03-10T09:05:00.000000Z");
    }

    #[test]
    fn parse_roundtrips_micros() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 9, 5, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(parse_ts(&format_ts(ts)).unwrap(), ts);
    }

    #[test]
    fn parse_accepts_offsets() {
        let parsed = parse_ts("2026-03-10T10:05:00+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 10, 9, 5, 0).unwrap());
    }

    #[test]
    fn time_of_day_formats() {
        let t = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        assert_eq!(format_time_of_day(t), "07:30:00");
        assert_eq!(parse_time_of_day("07:30:00").unwrap(), t);
        assert_eq!(parse_time_of_day("07:30").unwrap(), t);
        assert!(parse_time_of_day("7pm").is_err());
    }
}
