//! Config command - View and manage vaultsync configuration
//!
//! Provides the `vaultsync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors
//! 3. Writes a starter configuration file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use vaultsync_core::config::{Config, ConfigBuilder};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Write a new configuration file
    Init {
        /// Vault directory to synchronize
        #[arg(long)]
        vault: Option<PathBuf>,
        /// Directory holding the remote object store
        #[arg(long)]
        remote: Option<PathBuf>,
        /// Replace an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(format, config_path),
            ConfigCommand::Validate => execute_validate(format, config_path),
            ConfigCommand::Init {
                vault,
                remote,
                force,
            } => execute_init(format, config_path, vault.clone(), remote.clone(), *force),
        }
    }
}

fn execute_show(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);

    info!(config_path = %config_path.display(), "Showing configuration");

    if matches!(format, OutputFormat::Json) {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_validate(format: OutputFormat, config_path: &Path) -> Result<()> {
    let formatter = get_formatter(format);

    // Load explicitly (not load_or_default) so parse errors surface
    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            let message = if config_path.exists() {
                format!("Failed to parse configuration: {e}")
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };
            if matches!(format, OutputFormat::Json) {
                let json = serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [message],
                });
                formatter.print_json(&json);
            } else if config_path.exists() {
                formatter.error(&message);
                formatter.info(&format!("File: {}", config_path.display()));
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info("Run 'vaultsync config init' to create one.");
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();

    if matches!(format, OutputFormat::Json) {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        let json = serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        });
        formatter.print_json(&json);
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

fn execute_init(
    format: OutputFormat,
    config_path: &Path,
    vault: Option<PathBuf>,
    remote: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    let config = write_initial_config(config_path, vault, remote, force)?;

    info!(config_path = %config_path.display(), "Configuration written");

    if matches!(format, OutputFormat::Json) {
        let json = serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
            "config": serde_json::to_value(&config)?,
        });
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Wrote {}", config_path.display()));
        formatter.info(&format!("Vault:  {}", config.sync.vault_root.display()));
        formatter.info(&format!("Remote: {}", config.sync.remote_root.display()));
        for error in config.validate() {
            formatter.warn(&error.to_string());
        }
    }

    Ok(())
}

/// Builds a default configuration with the given overrides and saves it
///
/// Refuses to replace an existing file unless `force` is set.
fn write_initial_config(
    config_path: &Path,
    vault: Option<PathBuf>,
    remote: Option<PathBuf>,
    force: bool,
) -> Result<Config> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to replace it)",
            config_path.display()
        );
    }

    let mut builder = ConfigBuilder::new();
    if let Some(vault) = vault {
        builder = builder.vault_root(vault);
    }
    if let Some(remote) = remote {
        builder = builder.remote_root(remote);
    }
    let config = builder.build();

    config
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(config)
}
