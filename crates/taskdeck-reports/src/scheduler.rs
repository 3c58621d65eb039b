//! Report scheduler.
//!
//! Each tick claims the due preferences, renders a digest per owner from
//! their current status counts, hands it to the [`Mailer`], and advances
//! `last_updated` to the owner's most recent send time. Delivery failures
//! are logged and counted but still advance `last_updated`; nothing is
//! retried. A preference that could not be rendered is released unsent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use taskdeck_settings::ReportSettings;
use taskdeck_store::{ReportPreference, StatusCounts, TaskStore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::digest::digest_message;
use crate::errors::{MailError, ReportError};
use crate::mailer::Mailer;
use crate::metrics::{
    REPORT_TICK_DURATION_SECONDS, REPORT_TICKS_TOTAL, REPORTS_DUE_TOTAL, REPORTS_FAILED_TOTAL,
    REPORTS_SENT_TOTAL,
};

/// Scheduler timing and message settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Wall-clock time between ticks.
    pub poll_interval: Duration,
    /// Minimum time between two digests for one owner.
    pub report_interval: chrono::Duration,
    /// How long a claimed preference stays invisible to other ticks.
    pub claim_lease: chrono::Duration,
    /// Digest subject line.
    pub subject: String,
    /// Digest from address.
    pub sender: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_settings(&ReportSettings::default())
    }
}

impl SchedulerConfig {
    /// Derive from the `reports` settings section.
    pub fn from_settings(settings: &ReportSettings) -> Self {
        let hours = i64::try_from(settings.interval_hours).unwrap_or(24);
        let lease = i64::try_from(settings.claim_lease_secs).unwrap_or(300);
        Self {
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            report_interval: chrono::Duration::hours(hours.max(1)),
            claim_lease: chrono::Duration::seconds(lease.max(1)),
            subject: settings.subject.clone(),
            sender: settings.sender.clone(),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Preferences claimed as due.
    pub due: usize,
    /// Digests accepted by the mailer.
    pub sent: usize,
    /// Digests that failed to render or deliver.
    pub failed: usize,
}

/// Polls report preferences and dispatches digests.
pub struct ReportScheduler {
    store: Arc<TaskStore>,
    mailer: Arc<dyn Mailer>,
    config: SchedulerConfig,
}

impl ReportScheduler {
    /// Create a scheduler.
    pub fn new(store: Arc<TaskStore>, mailer: Arc<dyn Mailer>, config: SchedulerConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Scheduler settings.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one tick at the current time.
    pub async fn run_tick(&self) -> Result<TickSummary, ReportError> {
        self.run_tick_at(Utc::now()).await
    }

    /// Run one tick as if the clock read `now`.
    ///
    /// Only a failure to claim is returned as an error. Per-owner failures
    /// are counted in the summary and do not stop other owners.
    pub async fn run_tick_at(&self, now: DateTime<Utc>) -> Result<TickSummary, ReportError> {
        let started = Instant::now();
        let interval = self.config.report_interval;
        let lease = self.config.claim_lease;
        let claimed = self
            .with_store(move |store| store.claim_due_reports(now, interval, lease))
            .await?;

        let mut summary = TickSummary {
            due: claimed.len(),
            ..TickSummary::default()
        };
        for pref in claimed {
            match self.dispatch(pref, now).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(error = %e, "digest dispatch failed");
                }
            }
        }

        metrics::counter!(REPORT_TICKS_TOTAL).increment(1);
        metrics::counter!(REPORTS_DUE_TOTAL).increment(summary.due as u64);
        metrics::histogram!(REPORT_TICK_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        if summary.due > 0 {
            info!(due = summary.due, sent = summary.sent, failed = summary.failed, "report tick");
        } else {
            debug!("report tick: nothing due");
        }
        Ok(summary)
    }

    async fn dispatch(&self, pref: ReportPreference, now: DateTime<Utc>) -> Result<(), ReportError> {
        let owner = pref.owner.clone();
        let counts = match self.counts_for(&owner).await {
            Ok(counts) => counts,
            Err(e) => {
                metrics::counter!(REPORTS_FAILED_TOTAL, "reason" => "store").increment(1);
                self.release(&owner).await;
                return Err(e);
            }
        };
        let Some(recipient) = pref.email.as_deref().filter(|e| !e.is_empty()) else {
            metrics::counter!(REPORTS_FAILED_TOTAL, "reason" => "no_recipient").increment(1);
            self.release(&owner).await;
            return Err(MailError::NotConfigured(format!("no email address for {owner}")).into());
        };

        let message = digest_message(
            &owner,
            recipient,
            &counts,
            &self.config.subject,
            &self.config.sender,
        );
        let delivery = self.mailer.send(&message).await;

        let interval = self.config.report_interval;
        let sent_at = self
            .with_store(move |store| store.complete_report(&pref, now, interval))
            .await?;
        debug!(owner = %owner, %sent_at, "report window advanced");

        match delivery {
            Ok(()) => {
                metrics::counter!(REPORTS_SENT_TOTAL).increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!(REPORTS_FAILED_TOTAL, "reason" => "delivery").increment(1);
                Err(e.into())
            }
        }
    }

    async fn counts_for(&self, owner: &str) -> Result<StatusCounts, ReportError> {
        let owner = owner.to_string();
        self.with_store(move |store| store.status_counts(&owner)).await
    }

    async fn release(&self, owner: &str) {
        let owner = owner.to_string();
        // release_report_claim logs its own failure; the lease expires anyway.
        let _ = self
            .with_store(move |store| store.release_report_claim(&owner))
            .await;
    }

    /// Run a blocking store call off the async runtime.
    async fn with_store<T, F>(&self, f: F) -> Result<T, ReportError>
    where
        T: Send + 'static,
        F: FnOnce(&TaskStore) -> taskdeck_store::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
    }

    /// Tick every `poll_interval` until `cancel` fires. The first tick runs
    /// immediately; late ticks are delayed, never burst.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_secs = self.config.poll_interval.as_secs(),
            interval_hours = self.config.report_interval.num_hours(),
            "report scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_tick().await {
                        warn!(error = %e, "report tick failed");
                    }
                }
                () = cancel.cancelled() => {
                    info!("report scheduler stopped");
                    return;
                }
            }
        }
    }

    /// Spawn [`Self::run`] on the current runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
