//! Configuration module for vaultsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! Sync state (the per-path tie-points) is deliberately not part of this
//! file; it lives in its own store, located by [`StateConfig`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for vaultsync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root directory of the local vault.
    pub vault_root: PathBuf,
    /// Root directory of the folder-backed remote store.
    pub remote_root: PathBuf,
    /// Remote folder the vault is mirrored into.
    pub remote_folder: String,
    /// Glob patterns (vault-relative) that are never synchronized.
    ///
    /// Excluding an already synchronized file leaves its remote copy and
    /// tie-point in place; it is not treated as a local deletion.
    pub excluded_paths: Vec<String>,
    /// Maximum number of concurrent per-path operations within a phase.
    pub concurrency: u32,
    /// Retries for transient remote failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
}

/// Sync-state persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Storage backend: `json` or `sqlite`.
    pub backend: String,
    /// Path of the state file or database.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("vaultsync")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vault_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Vault"),
            remote_root: data_dir().join("remote"),
            remote_folder: "vault".to_string(),
            excluded_paths: vec![".git/**".to_string(), ".trash/**".to_string()],
            concurrency: 4,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: "json".to_string(),
            path: data_dir().join("sync_state.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.concurrency"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `state.backend`.
const VALID_STATE_BACKENDS: &[&str] = &["json", "sqlite"];

/// Upper bound for `sync.concurrency`.
const MAX_CONCURRENCY: u32 = 32;

/// Upper bound for `sync.max_retries`.
const MAX_RETRIES: u32 = 10;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        // Tilde paths are expanded at runtime, so only check literal ones.
        let root_str = self.sync.vault_root.to_string_lossy();
        if !root_str.starts_with('~') && !self.sync.vault_root.is_dir() {
            errors.push(ValidationError {
                field: "sync.vault_root".into(),
                message: format!(
                    "directory does not exist: {}",
                    self.sync.vault_root.display()
                ),
            });
        }
        if self.sync.remote_root == self.sync.vault_root {
            errors.push(ValidationError {
                field: "sync.remote_root".into(),
                message: "must differ from sync.vault_root".into(),
            });
        }
        if self.sync.remote_folder.is_empty()
            || self.sync.remote_folder.contains('/')
            || self.sync.remote_folder == "."
            || self.sync.remote_folder == ".."
        {
            errors.push(ValidationError {
                field: "sync.remote_folder".into(),
                message: format!(
                    "must be a single folder name, got '{}'",
                    self.sync.remote_folder
                ),
            });
        }
        for pattern in &self.sync.excluded_paths {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError {
                    field: "sync.excluded_paths".into(),
                    message: format!("invalid glob '{pattern}': {e}"),
                });
            }
        }
        if self.sync.concurrency == 0 || self.sync.concurrency > MAX_CONCURRENCY {
            errors.push(ValidationError {
                field: "sync.concurrency".into(),
                message: format!("must be in range 1..={MAX_CONCURRENCY}"),
            });
        }
        if self.sync.max_retries > MAX_RETRIES {
            errors.push(ValidationError {
                field: "sync.max_retries".into(),
                message: format!("must not exceed {MAX_RETRIES}"),
            });
        }

        // --- state ---
        if !VALID_STATE_BACKENDS.contains(&self.state.backend.as_str()) {
            errors.push(ValidationError {
                field: "state.backend".into(),
                message: format!(
                    "invalid backend '{}'; valid options: {}",
                    self.state.backend,
                    VALID_STATE_BACKENDS.join(", ")
                ),
            });
        }
        if self.state.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "state.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use vaultsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .vault_root(PathBuf::from("/home/user/Vault"))
///     .concurrency(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn vault_root(mut self, root: PathBuf) -> Self {
        self.config.sync.vault_root = root;
        self
    }

    pub fn remote_root(mut self, root: PathBuf) -> Self {
        self.config.sync.remote_root = root;
        self
    }

    pub fn remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.sync.remote_folder = folder.into();
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.sync.excluded_paths.push(pattern.into());
        self
    }

    pub fn concurrency(mut self, n: u32) -> Self {
        self.config.sync.concurrency = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.sync.max_retries = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.retry_base_delay_ms = ms;
        self
    }

    // --- state ---

    pub fn state_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.state.backend = backend.into();
        self
    }

    pub fn state_path(mut self, path: PathBuf) -> Self {
        self.config.state.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
