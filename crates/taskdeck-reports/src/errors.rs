//! Error types for digest dispatch.

use taskdeck_store::TaskError;
use thiserror::Error;

/// Mail delivery failures.
#[derive(Debug, Error)]
pub enum MailError {
    /// The request never got a response (connect, TLS, timeout).
    #[error("mail transport error: {0}")]
    Transport(String),

    /// The relay answered with a non-success status.
    #[error("mail relay rejected message: HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The selected transport is missing required settings.
    #[error("mail transport not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Errors surfaced by the report scheduler.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Store read or write failed.
    #[error(transparent)]
    Store(#[from] TaskError),

    /// Delivery failed.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
