//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the settings file. A missing file is not an error.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file (or the merged result) is not valid settings JSON.
    #[error("bad settings JSON in {}: {source}", path.display())]
    Json {
        /// Settings file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_file() {
        let err = SettingsError::Io {
            path: PathBuf::from("/etc/taskdeck/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "cannot read /etc/taskdeck/settings.json: denied"
        );

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SettingsError::Json {
            path: PathBuf::from("s.json"),
            source,
        };
        assert!(err.to_string().starts_with("bad settings JSON in s.json: "));
    }
}
