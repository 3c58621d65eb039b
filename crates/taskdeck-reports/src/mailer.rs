//! Mail delivery collaborators.
//!
//! The scheduler hands each digest to a [`Mailer`] and does not retry.
//! [`LogMailer`] only logs; [`HttpRelayMailer`] posts the message as JSON to
//! an HTTP mail relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskdeck_settings::{MailSettings, MailTransport};
use tracing::{debug, info};

use crate::digest::MailMessage;
use crate::errors::MailError;

/// Delivers one message.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `message`. Implementations must not retry.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "digest (log transport)"
        );
        debug!(body = %message.body, "digest body");
        Ok(())
    }
}

/// Posts messages to an HTTP relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpRelayMailer {
    client: reqwest::Client,
    relay_url: String,
}

impl HttpRelayMailer {
    /// Build a relay mailer with a per-request timeout.
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
        })
    }

    /// Relay endpoint.
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(message)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(recipient = %message.recipient, "digest accepted by relay");
        Ok(())
    }
}

/// Build the mailer selected by `settings.transport`.
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    match settings.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Http => {
            let url = settings
                .relay_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| {
                    MailError::NotConfigured("http transport requires mail.relayUrl".into())
                })?;
            let mailer =
                HttpRelayMailer::new(url, Duration::from_millis(settings.timeout_ms))?;
            Ok(Arc::new(mailer))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
