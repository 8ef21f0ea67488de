//! Status command - Display synchronization status
//!
//! Provides the `vaultsync status` CLI command which:
//! 1. Shows where the vault, the remote folder and the sync state live
//! 2. Shows how many paths have a recorded tie-point
//! 3. Lists the changes the next run would make (unless `--offline`)

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use vaultsync_core::config::Config;
use vaultsync_core::domain::SyncPlanEntry;
use vaultsync_sync::SyncPlan;

use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only read the recorded sync state; do not list the vault or remote
    #[arg(long)]
    pub offline: bool,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let formatter = get_formatter(format);

        let config = super::load_runtime_config(config_path)?;
        let state = super::open_state_store(&config).await?;
        let tracked = state
            .load()
            .await
            .context("Failed to load sync state")?
            .len();

        let plan = if self.offline {
            None
        } else {
            let reconciler = super::build_reconciler(&config, state)?;
            match reconciler.plan().await {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!(error = %e, "Could not compute pending changes");
                    formatter.warn(&format!("Could not compute pending changes: {e:#}"));
                    None
                }
            }
        };

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&status_json(&config, tracked, plan.as_ref()));
        } else {
            print_status(&config, tracked, plan.as_ref(), formatter.as_ref());
        }
        Ok(())
    }
}

/// Actionable entries grouped by "direction kind" (e.g. "upload new")
fn pending_counts(plan: &SyncPlan) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in plan.actionable() {
        *counts
            .entry(format!("{} {}", entry.direction, entry.kind))
            .or_insert(0) += 1;
    }
    counts
}

fn status_json(config: &Config, tracked: usize, plan: Option<&SyncPlan>) -> serde_json::Value {
    let pending = plan.map(|plan| {
        let changes: Vec<&SyncPlanEntry> = plan.actionable().collect();
        serde_json::json!({
            "counts": pending_counts(plan),
            "changes": changes,
            "state_repairs": plan.repairs,
        })
    });

    serde_json::json!({
        "vault_root": config.sync.vault_root.display().to_string(),
        "remote_root": config.sync.remote_root.display().to_string(),
        "remote_folder": config.sync.remote_folder,
        "state_backend": config.state.backend,
        "state_path": config.state.path.display().to_string(),
        "tracked_paths": tracked,
        "pending": pending,
    })
}

fn print_status(
    config: &Config,
    tracked: usize,
    plan: Option<&SyncPlan>,
    formatter: &dyn OutputFormatter,
) {
    formatter.success("vaultsync status");
    formatter.info("");
    formatter.info(&format!("Vault:   {}", config.sync.vault_root.display()));
    formatter.info(&format!(
        "Remote:  {} (folder '{}')",
        config.sync.remote_root.display(),
        config.sync.remote_folder
    ));
    formatter.info(&format!(
        "State:   {} ({})",
        config.state.path.display(),
        config.state.backend
    ));
    formatter.info(&format!("Tracked: {}", plural(tracked as u64, "path")));

    let Some(plan) = plan else {
        return;
    };
    formatter.info("");

    let counts = pending_counts(plan);
    if counts.is_empty() {
        formatter.info("Up to date, nothing pending");
    } else {
        formatter.info("Pending:");
        for (label, count) in &counts {
            formatter.info(&format!("  {label:<16} {count}"));
        }
        for entry in plan.actionable() {
            formatter.info(&format!("    {} {} - {}", entry.kind, entry.path, entry.reason));
        }
    }
    if !plan.repairs.is_empty() {
        formatter.warn(&format!(
            "{} with a stale sync record",
            plural(plan.repairs.len() as u64, "path")
        ));
    }
}
