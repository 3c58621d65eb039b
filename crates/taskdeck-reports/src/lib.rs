//! # taskdeck-reports
//!
//! Periodic per-owner digests of task counts.
//!
//! [`ReportScheduler`] polls on a fixed interval. Each tick claims the due
//! report preferences from the [`TaskStore`](taskdeck_store::TaskStore),
//! renders a digest per owner, and hands it to a [`Mailer`].

#![deny(unsafe_code)]

pub mod digest;
pub mod errors;
pub mod mailer;
pub mod metrics;
pub mod scheduler;

pub use digest::{MailMessage, digest_message, render_digest};
pub use errors::{MailError, ReportError};
pub use mailer::{HttpRelayMailer, LogMailer, Mailer, mailer_from_settings};
pub use scheduler::{ReportScheduler, SchedulerConfig, TickSummary};
