//! Database settings.

use serde::{Deserialize, Serialize};

/// `SQLite` database location and pool tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path. Empty means `<settings dir>/taskdeck.db`.
    pub path: String,
    /// Maximum number of pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}
