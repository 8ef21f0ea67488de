//! vaultsync CLI - Command-line interface for vaultsync
//!
//! Provides commands for:
//! - Running one reconciliation between the vault and the remote
//! - Previewing what a run would do
//! - Inspecting the recorded sync state
//! - Managing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vaultsync_core::config::Config;

mod commands;
mod output;

use commands::{config::ConfigCommand, status::StatusCommand, sync::SyncCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "vaultsync",
    version,
    about = "Keep a notes vault and a remote folder in sync"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the vault with the remote folder
    Sync(SyncCommand),
    /// Show sync state and pending changes
    Status(StatusCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter: `RUST_LOG` wins, then the command line, then the config file
fn log_filter(cli: &Cli, config_path: &std::path::Path) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => Config::load_or_default(config_path).logging.level,
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    };
    EnvFilter::new(level)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&cli, &config_path))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, &config_path).await,
        Commands::Status(cmd) => cmd.execute(format, &config_path).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
    }
}
