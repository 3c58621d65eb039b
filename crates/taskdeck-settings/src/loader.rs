//! Layered settings loading.
//!
//! Compiled defaults, then the JSON file merged over them key by key, then
//! `TASKDECK_*` environment overrides, then [`TaskdeckSettings::validate`].
//! In the file, nested objects merge recursively, any other value replaces
//! the default, and `null` keeps the default.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{MailTransport, TaskdeckSettings};

/// Settings directory: `$TASKDECK_HOME`, else `~/.taskdeck`.
pub fn settings_dir() -> PathBuf {
    if let Some(dir) = env_value("TASKDECK_HOME") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".taskdeck")
}

/// `<settings dir>/settings.json`.
pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Configured database file, or `<settings dir>/taskdeck.db` when unset.
pub fn database_path(settings: &TaskdeckSettings) -> PathBuf {
    match settings.database.path.trim() {
        "" => settings_dir().join("taskdeck.db"),
        path => PathBuf::from(path),
    }
}

/// Load from [`settings_path`].
pub fn load_settings() -> Result<TaskdeckSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path`. A missing file yields defaults (plus env overrides).
pub fn load_settings_from_path(path: &Path) -> Result<TaskdeckSettings> {
    let json_err = |source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    };

    let mut layered = serde_json::to_value(TaskdeckSettings::default()).map_err(json_err)?;
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let file: Value = serde_json::from_str(&text).map_err(json_err)?;
            debug!(path = %path.display(), "merging settings file");
            merge_json(&mut layered, file);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let mut settings: TaskdeckSettings = serde_json::from_value(layered).map_err(json_err)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Merge `overlay` into `base` in place.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `TASKDECK_*` overrides. Unparseable values are logged and skipped.
pub fn apply_env_overrides(settings: &mut TaskdeckSettings) {
    if let Some(path) = env_value("TASKDECK_DB_PATH") {
        settings.database.path = path;
    }
    if let Some(n) = env_parsed("TASKDECK_DB_POOL_SIZE", |v| in_range::<u32>(v, 1, 256)) {
        settings.database.pool_size = n;
    }
    if let Some(on) = env_parsed("TASKDECK_REPORTS_ENABLED", parse_bool) {
        settings.reports.enabled = on;
    }
    if let Some(secs) =
        env_parsed("TASKDECK_POLL_INTERVAL_SECS", |v| in_range::<u64>(v, 1, 86_400))
    {
        settings.reports.poll_interval_secs = secs;
    }
    if let Some(transport) = env_parsed("TASKDECK_MAIL_TRANSPORT", parse_transport) {
        settings.mail.transport = transport;
    }
    if let Some(url) = env_value("TASKDECK_MAIL_RELAY_URL") {
        settings.mail.relay_url = Some(url);
    }
    if let Some(sender) = env_value("TASKDECK_MAIL_SENDER") {
        settings.reports.sender = sender;
    }
    if let Some(level) = env_value("TASKDECK_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `log` or `http`, any case.
pub fn parse_transport(raw: &str) -> Option<MailTransport> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "log" => Some(MailTransport::Log),
        "http" => Some(MailTransport::Http),
        _ => None,
    }
}

/// Parse a number and keep it only if it lies in `min..=max`.
pub fn in_range<T: FromStr + PartialOrd>(raw: &str, min: T, max: T) -> Option<T> {
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|n| (min..=max).contains(n))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = env_value(name)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(key = name, value = %raw, "ignoring invalid environment override");
    }
    parsed
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
