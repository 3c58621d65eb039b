//! # taskdeck-settings
//!
//! Typed configuration for the taskdeck worker and CLI.
//!
//! [`load_settings`] starts from [`TaskdeckSettings::default()`], merges
//! `settings.json` from [`settings_dir`] over it, then applies `TASKDECK_*`
//! environment overrides and clamps out-of-range values. The binary loads
//! once at startup and publishes the result through [`init_settings`];
//! everything else reads it back with [`get_settings`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    database_path, load_settings, load_settings_from_path, merge_json, settings_dir,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<TaskdeckSettings> = OnceLock::new();

/// Process-wide settings. Loads lazily from [`settings_path`] if
/// [`init_settings`] was never called; a load failure falls back to defaults.
pub fn get_settings() -> &'static TaskdeckSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings unreadable, running on defaults");
            TaskdeckSettings::default()
        })
    })
}

/// Publish `settings` as the process-wide value. Hands it back if a value
/// was already published.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TaskdeckSettings) -> std::result::Result<(), TaskdeckSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_validation_unchanged() {
        let mut settings = TaskdeckSettings::default();
        let before = serde_json::to_value(&settings).unwrap();
        settings.validate();
        assert_eq!(serde_json::to_value(&settings).unwrap(), before);
        assert_eq!(settings.reports.sender, "reports@taskdeck.local");
        assert_eq!(settings.mail.transport, MailTransport::Log);
    }

    #[test]
    fn settings_file_lives_in_settings_dir() {
        assert_eq!(settings_path(), settings_dir().join("settings.json"));
    }
}
