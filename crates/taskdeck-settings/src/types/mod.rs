//! Settings structs. Keys are camelCase in JSON and every field may be
//! omitted.

mod database;
mod reports;

pub use database::*;
pub use reports::*;

use serde::{Deserialize, Serialize};

/// Everything taskdeck reads from `settings.json`.
///
/// Example file:
///
/// ```json
/// {
///   "database": { "path": "/var/lib/taskdeck/taskdeck.db" },
///   "reports": { "pollIntervalSecs": 30 },
///   "mail": { "transport": "http", "relayUrl": "http://127.0.0.1:8025/send" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskdeckSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// `SQLite` database settings.
    pub database: DatabaseSettings,
    /// Digest scheduling settings.
    pub reports: ReportSettings,
    /// Mail delivery settings.
    pub mail: MailSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for TaskdeckSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "taskdeck".to_string(),
            database: DatabaseSettings::default(),
            reports: ReportSettings::default(),
            mail: MailSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl TaskdeckSettings {
    /// Replace unusable values (zero intervals, an empty pool, a claim
    /// lease shorter than the poll interval) with the nearest usable one.
    pub fn validate(&mut self) {
        if self.database.pool_size == 0 {
            tracing::warn!("database pool_size is 0, using 1");
            self.database.pool_size = 1;
        }

        let reports = &mut self.reports;
        if reports.poll_interval_secs == 0 {
            tracing::warn!("reports poll_interval_secs is 0, using 1");
            reports.poll_interval_secs = 1;
        }
        if reports.interval_hours == 0 {
            tracing::warn!("reports interval_hours is 0, using 1");
            reports.interval_hours = 1;
        }
        if reports.claim_lease_secs < reports.poll_interval_secs {
            tracing::warn!(
                "reports claim_lease_secs ({}) < poll_interval_secs ({}), correcting",
                reports.claim_lease_secs,
                reports.poll_interval_secs
            );
            reports.claim_lease_secs = reports.poll_interval_secs;
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_version() {
        let s = TaskdeckSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.name, "taskdeck");
    }

    #[test]
    fn default_settings_json_field_names() {
        let json = serde_json::to_value(TaskdeckSettings::default()).unwrap();
        assert!(json["database"].get("poolSize").is_some());
        assert!(json["reports"].get("pollIntervalSecs").is_some());
        assert!(json["reports"].get("claimLeaseSecs").is_some());
        assert!(json["mail"].get("timeoutMs").is_some());
        assert!(json["mail"].get("relayUrl").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: TaskdeckSettings =
            serde_json::from_str(r#"{"reports": {"enabled": false}}"#).unwrap();
        assert!(!s.reports.enabled);
        assert_eq!(s.reports.poll_interval_secs, 60);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn validate_clamps_zero_values() {
        let mut s = TaskdeckSettings::default();
        s.database.pool_size = 0;
        s.reports.poll_interval_secs = 0;
        s.reports.interval_hours = 0;
        s.validate();
        assert_eq!(s.database.pool_size, 1);
        assert_eq!(s.reports.poll_interval_secs, 1);
        assert_eq!(s.reports.interval_hours, 1);
    }

    #[test]
    fn validate_raises_lease_to_poll_interval() {
        let mut s = TaskdeckSettings::default();
        s.reports.poll_interval_secs = 600;
        s.reports.claim_lease_secs = 10;
        s.validate();
        assert_eq!(s.reports.claim_lease_secs, 600);
    }
}
