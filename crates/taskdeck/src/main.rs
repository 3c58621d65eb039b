//! # taskdeck
//!
//! Command-line front end and report worker. Loads settings, opens the task
//! database, and dispatches to a task, report, or worker command.

#![deny(unsafe_code)]

mod commands;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskdeck_reports::{ReportScheduler, SchedulerConfig, mailer_from_settings};
use taskdeck_settings::TaskdeckSettings;
use taskdeck_store::{ConnectionConfig, TaskStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::{ReportAction, TaskAction};

/// Prioritized task lists with status history and email digests.
#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about)]
struct Cli {
    /// Path to the `SQLite` database (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Owner key for task and report commands (defaults to `$USER`).
    #[arg(long, global = true)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the report scheduler until Ctrl-C.
    Worker,
    /// Run a single report tick and print its summary.
    Tick,
    /// Apply pending schema migrations.
    Migrate,
    /// Manage tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Manage the digest preference.
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

impl Cli {
    fn owner(&self) -> String {
        self.owner
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| "default".to_string())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn open_store(path: &Path, settings: &TaskdeckSettings) -> Result<TaskStore> {
    ensure_parent_dir(path)?;
    let config = ConnectionConfig {
        pool_size: settings.database.pool_size,
        busy_timeout_ms: settings.database.busy_timeout_ms,
        ..ConnectionConfig::default()
    };
    TaskStore::open_file(&path.to_string_lossy(), &config)
        .with_context(|| format!("failed to open database: {}", path.display()))
}

fn build_scheduler(store: TaskStore, settings: &TaskdeckSettings) -> Result<ReportScheduler> {
    let mailer = mailer_from_settings(&settings.mail).context("failed to set up mail transport")?;
    Ok(ReportScheduler::new(
        Arc::new(store),
        mailer,
        SchedulerConfig::from_settings(&settings.reports),
    ))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings first: the log level comes from them.
    let settings_path = taskdeck_settings::settings_path();
    let (settings, load_error) = match taskdeck_settings::load_settings_from_path(&settings_path)
    {
        Ok(s) => (s, None),
        Err(e) => (TaskdeckSettings::default(), Some(e)),
    };
    logging::init_subscriber(&settings.logging.level);
    if let Some(e) = load_error {
        warn!(path = %settings_path.display(), error = %e, "failed to load settings, using defaults");
    }
    let _ = taskdeck_settings::init_settings(settings);
    let settings = taskdeck_settings::get_settings();

    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(|| taskdeck_settings::database_path(settings));
    let owner = cli.owner();
    let store = open_store(&db_path, settings)?;

    match cli.command {
        Command::Migrate => {
            print_json(&serde_json::json!({
                "database": db_path.display().to_string(),
                "schemaVersion": store.schema_version()?,
            }))?;
        }
        Command::Task { action } => {
            print_json(&commands::run_task(&store, &owner, action)?)?;
        }
        Command::Report { action } => {
            print_json(&commands::run_report(&store, &owner, action)?)?;
        }
        Command::Tick => {
            let scheduler = build_scheduler(store, settings)?;
            let summary = scheduler.run_tick().await?;
            print_json(&serde_json::to_value(summary)?)?;
        }
        Command::Worker => {
            if !settings.reports.enabled {
                warn!("reports are disabled in settings; worker exiting");
                return Ok(());
            }
            let scheduler = Arc::new(build_scheduler(store, settings)?);
            let cancel = CancellationToken::new();
            let handle = Arc::clone(&scheduler).spawn(cancel.clone());
            info!(database = %db_path.display(), "worker running");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            info!("shutting down");
            cancel.cancel();
            let _ = handle.await;
            info!("shutdown complete");
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
