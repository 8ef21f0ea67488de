//! Sync command - Reconcile the vault with the remote folder
//!
//! Provides the `vaultsync sync` CLI command which:
//! 1. Loads and validates the configuration
//! 2. Opens the sync-state store and both stores
//! 3. Runs one reconciliation (or only plans it with `--dry-run`)
//! 4. Displays the report
//!
//! Ctrl+C or SIGTERM stops the run at the next phase boundary; everything
//! finished so far is already checkpointed.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vaultsync_core::domain::{RunOutcome, SyncReport};
use vaultsync_sync::{Reconciler, SyncPlan};

use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let config = super::load_runtime_config(config_path)?;
        let state = super::open_state_store(&config).await?;
        let reconciler = super::build_reconciler(&config, state)?;

        info!(
            vault = %config.sync.vault_root.display(),
            remote = %config.sync.remote_root.display(),
            folder = %config.sync.remote_folder,
            "Starting sync"
        );

        if self.dry_run {
            let plan = reconciler.plan().await?;
            print_plan(&plan, format, formatter.as_ref());
            return Ok(());
        }

        let report = run_until_signalled(&reconciler).await?;
        print_report(&report, format, formatter.as_ref())?;

        match &report.outcome {
            RunOutcome::Aborted(reason) => anyhow::bail!("Sync aborted: {reason}"),
            RunOutcome::Completed | RunOutcome::Cancelled => Ok(()),
        }
    }
}

/// Runs once, cancelling at the next phase boundary on SIGINT/SIGTERM
async fn run_until_signalled(reconciler: &Reconciler) -> Result<SyncReport> {
    let token = CancellationToken::new();
    let signal = tokio::spawn(shutdown_signal(token.clone()));

    let result = reconciler.run_sync_with_cancel(&token).await;
    signal.abort();
    Ok(result?)
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), stopping after the current phase"),
        _ = terminate => info!("Received SIGTERM, stopping after the current phase"),
    }

    token.cancel();
}

fn print_plan(plan: &SyncPlan, format: OutputFormat, formatter: &dyn OutputFormatter) {
    let changes: Vec<_> = plan.actionable().collect();

    if matches!(format, OutputFormat::Json) {
        let json = serde_json::json!({
            "dry_run": true,
            "changes": changes,
            "state_repairs": plan.repairs,
        });
        formatter.print_json(&json);
        return;
    }

    if changes.is_empty() {
        formatter.success("Already up to date (dry run)");
        return;
    }

    formatter.success(&format!(
        "Dry run: {} planned",
        plural(changes.len() as u64, "change")
    ));
    for entry in &changes {
        formatter.info(&format!(
            "{:<8} {:<9} {}  ({})",
            entry.direction, entry.kind, entry.path, entry.reason
        ));
    }
    for path in &plan.repairs {
        formatter.warn(&format!("{path}: recorded remote object no longer exists"));
    }
}

fn print_report(
    report: &SyncReport,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        formatter.print_json(&serde_json::to_value(report)?);
        return Ok(());
    }

    let duration_display = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    match &report.outcome {
        RunOutcome::Completed if report.total_changes() == 0 && report.errors.is_empty() => {
            formatter.success("Already up to date");
        }
        RunOutcome::Completed => {
            formatter.success(&format!("Sync completed in {duration_display}"));
        }
        RunOutcome::Cancelled => {
            formatter.warn(&format!("Sync cancelled after {duration_display}"));
        }
        RunOutcome::Aborted(reason) => {
            formatter.error(&format!("Sync aborted after {duration_display}: {reason}"));
        }
    }

    let lines = [
        ("Uploaded:  ", report.uploaded),
        ("Downloaded:", report.downloaded),
        ("Removed locally: ", report.deleted_local),
        ("Removed remotely:", report.deleted_remote),
        ("Conflicts: ", report.conflicts),
    ];
    for (label, count) in lines {
        if count > 0 {
            formatter.info(&format!("{label} {}", plural(count, "file")));
        }
    }
    if report.conflicts > 0 {
        formatter.info("Local versions of conflicting files were kept as *_local_conflict_* copies");
    }
    for path in &report.state_repairs {
        formatter.warn(&format!("{path}: stale sync record repaired"));
    }

    if !report.errors.is_empty() {
        formatter.error(&format!(
            "{} occurred:",
            plural(report.errors.len() as u64, "error")
        ));
        for issue in &report.errors {
            formatter.info(&format!("  - {issue}"));
        }
    }

    Ok(())
}
