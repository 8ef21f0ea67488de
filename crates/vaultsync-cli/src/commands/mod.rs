//! Subcommands and the store wiring they share

pub mod config;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use vaultsync_cache::{JsonSyncStateStore, SqliteSyncStateStore};
use vaultsync_core::config::Config;
use vaultsync_core::ports::ISyncStateStore;
use vaultsync_sync::filesystem::VaultFileSystem;
use vaultsync_sync::remote_folder::FolderRemoteStore;
use vaultsync_sync::{Reconciler, ReconcilerOptions};

/// Expand tilde (~) in a path to the user's home directory
pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    let Some(raw) = path.to_str() else {
        return path.to_path_buf();
    };
    if let Some(stripped) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    } else if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    path.to_path_buf()
}

/// Loads the configuration a run needs
///
/// A missing file means defaults; a file that does not parse or does not
/// validate is an error. Paths come back with `~` expanded.
pub(crate) fn load_runtime_config(config_path: &Path) -> Result<Config> {
    let mut config = if config_path.exists() {
        Config::load(config_path)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?
    } else {
        debug!(config_path = %config_path.display(), "No configuration file, using defaults");
        Config::default()
    };

    config.sync.vault_root = expand_tilde(&config.sync.vault_root);
    config.sync.remote_root = expand_tilde(&config.sync.remote_root);
    config.state.path = expand_tilde(&config.state.path);

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }

    info!(config_path = %config_path.display(), "Loaded configuration");
    Ok(config)
}

/// Opens the sync-state store selected by `state.backend`
pub(crate) async fn open_state_store(config: &Config) -> Result<Arc<dyn ISyncStateStore>> {
    match config.state.backend.as_str() {
        "json" => Ok(Arc::new(JsonSyncStateStore::new(&config.state.path))),
        "sqlite" => {
            let store = SqliteSyncStateStore::open(&config.state.path)
                .await
                .context("Failed to open sync-state database")?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown state backend '{other}'"),
    }
}

/// Wires the vault, the remote folder and `state` into a reconciler
pub(crate) fn build_reconciler(
    config: &Config,
    state: Arc<dyn ISyncStateStore>,
) -> Result<Reconciler> {
    let local = VaultFileSystem::with_excludes(&config.sync.vault_root, &config.sync.excluded_paths)
        .context("Failed to set up the vault")?;
    let remote = FolderRemoteStore::new(&config.sync.remote_root, &config.sync.remote_folder);

    Ok(Reconciler::new(
        Arc::new(local),
        Arc::new(remote),
        state,
        ReconcilerOptions::from_config(&config.sync),
    ))
}
