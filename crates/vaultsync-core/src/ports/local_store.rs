//! Local store port (driven/secondary port)
//!
//! This module defines the interface to the local vault: a tree of files
//! addressed by [`VaultPath`].
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - Writes are whole-file: an implementation must never leave a
//!   half-written file at the target path.
//! - `list` reports unreadable paths separately instead of failing, so a
//!   single bad file cannot be mistaken for a deleted one.

use crate::domain::entry::LocalEntry;
use crate::domain::newtypes::VaultPath;

/// How `write_bytes` treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `StoreError::AlreadyExists` if the file exists
    Create,
    /// Fail with `StoreError::NotFound` if the file does not exist
    Overwrite,
}

/// A path the listing could not inspect
///
/// The path may name a directory; everything beneath it is then unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingIssue {
    pub path: VaultPath,
    pub message: String,
}

/// Result of one listing pass over the vault
#[derive(Debug, Clone, Default)]
pub struct LocalListing {
    pub entries: Vec<LocalEntry>,
    pub issues: Vec<ListingIssue>,
    /// Files and directories present on disk but matched by an exclusion
    pub excluded: Vec<VaultPath>,
}

/// Port trait for local vault operations
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    /// Lists every regular file in the vault, minus excluded paths
    ///
    /// # Errors
    /// Only if the vault as a whole cannot be listed (e.g. missing root)
    async fn list(&self) -> anyhow::Result<LocalListing>;

    /// Reads the entire contents of a file
    async fn read_bytes(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>>;

    /// Replaces (or creates) a file's contents atomically
    ///
    /// Parent directories are created as needed.
    async fn write_bytes(&self, path: &VaultPath, data: &[u8], mode: WriteMode)
        -> anyhow::Result<()>;

    /// Deletes a file
    ///
    /// # Errors
    /// `StoreError::NotFound` if the file does not exist
    async fn delete(&self, path: &VaultPath) -> anyhow::Result<()>;

    /// Current state of a file, `None` if it does not exist
    async fn stat(&self, path: &VaultPath) -> anyhow::Result<Option<LocalEntry>>;

    /// Whether a file exists at `path`
    async fn exists(&self, path: &VaultPath) -> anyhow::Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }
}
