//! Digest scheduling and mail delivery settings.

use serde::{Deserialize, Serialize};

/// Report scheduler settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    /// Whether the worker runs the digest scheduler at all.
    pub enabled: bool,
    /// Seconds between polling ticks.
    pub poll_interval_secs: u64,
    /// Minimum hours between two digests for the same user.
    pub interval_hours: u64,
    /// How long a claimed preference stays reserved for one dispatcher.
    pub claim_lease_secs: u64,
    /// Sender address of digest messages.
    pub sender: String,
    /// Subject line of digest messages.
    pub subject: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
            interval_hours: 24,
            claim_lease_secs: 300,
            sender: "reports@taskdeck.local".to_string(),
            subject: "Tasks Report".to_string(),
        }
    }
}

/// Mail transport used to hand off digests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write messages to the log only.
    #[default]
    Log,
    /// POST messages as JSON to an HTTP mail relay.
    Http,
}

/// Mail delivery settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailSettings {
    /// Which transport delivers messages.
    pub transport: MailTransport,
    /// Relay endpoint for the `http` transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,
    /// Request timeout for the relay in milliseconds.
    pub timeout_ms: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransport::Log,
            relay_url: None,
            timeout_ms: 10_000,
        }
    }
}
