//! Local vault adapter (secondary/driven adapter)
//!
//! Implements [`ILocalStore`] over a directory using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: content goes to `<name>.vaultsync.tmp` next to the
//!   target and is renamed into place, so a crash never leaves a
//!   half-written file under the real name. Leftover temp files are
//!   ignored by the walk.
//! - **Exclusions**: glob patterns (`glob::Pattern`) matched against the
//!   vault-relative path with `/` as a literal separator.
//! - **Unreadable entries**: a file or directory whose metadata cannot be
//!   read is reported as a listing issue instead of failing the walk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use glob::{MatchOptions, Pattern};
use tracing::{debug, instrument, warn};

use vaultsync_core::domain::{LocalEntry, StoreError, VaultPath};
use vaultsync_core::ports::{ILocalStore, ListingIssue, LocalListing, WriteMode};

/// Suffix of in-flight write files
pub const TEMP_SUFFIX: &str = ".vaultsync.tmp";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Adapter that bridges the [`ILocalStore`] port to a directory tree
#[derive(Debug, Clone)]
pub struct VaultFileSystem {
    root: PathBuf,
    excludes: Vec<Pattern>,
}

impl VaultFileSystem {
    /// Create an adapter for `root` with no exclusions
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
        }
    }

    /// Create an adapter that skips paths matching any of `patterns`
    ///
    /// # Errors
    /// Returns error if a pattern is not a valid glob
    pub fn with_excludes(root: impl Into<PathBuf>, patterns: &[String]) -> anyhow::Result<Self> {
        let excludes = patterns
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern: {p}")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            root: root.into(),
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.excludes
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }

    /// A directory is skipped when a pattern excludes everything below it
    fn is_excluded_dir(&self, relative: &str) -> bool {
        self.is_excluded(relative)
            || self
                .excludes
                .iter()
                .any(|p| p.as_str() == format!("{relative}/**"))
    }

    fn target(&self, path: &VaultPath) -> PathBuf {
        path.to_fs_path(&self.root)
    }

    /// Recursively walks a directory, collecting regular files
    fn walk_directory<'a>(
        &'a self,
        dir: PathBuf,
        listing: &'a mut LocalListing,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if dir == self.root => {
                    return Err(err).with_context(|| {
                        format!("Failed to read vault root: {}", self.root.display())
                    });
                }
                Err(err) => {
                    self.record_issue(&dir, &err, listing);
                    return Ok(());
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        self.record_issue(&dir, &err, listing);
                        break;
                    }
                };

                let entry_path = entry.path();
                let Some(relative) = entry_path
                    .strip_prefix(&self.root)
                    .ok()
                    .and_then(|rel| VaultPath::from_relative(rel).ok())
                else {
                    warn!(path = ?entry_path, "Skipping path that cannot be synchronized");
                    continue;
                };

                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(err) => {
                        self.record_issue(&entry_path, &err, listing);
                        continue;
                    }
                };

                if file_type.is_dir() {
                    if self.is_excluded_dir(relative.as_str()) {
                        debug!(path = %relative, "excluded directory");
                        listing.excluded.push(relative);
                        continue;
                    }
                    self.walk_directory(entry_path, listing).await?;
                } else if file_type.is_file() {
                    if relative.as_str().ends_with(TEMP_SUFFIX) {
                        continue;
                    }
                    if self.is_excluded(relative.as_str()) {
                        listing.excluded.push(relative);
                        continue;
                    }
                    match entry.metadata().await.and_then(|m| modified_ms(&m)) {
                        Ok(mtime) => listing.entries.push(LocalEntry::new(relative, mtime)),
                        Err(err) => listing.issues.push(ListingIssue {
                            path: relative,
                            message: format!("Failed to read metadata: {err}"),
                        }),
                    }
                } else {
                    debug!(path = %relative, "skipping non-regular file");
                }
            }

            Ok(())
        })
    }

    fn record_issue(&self, fs_path: &Path, err: &std::io::Error, listing: &mut LocalListing) {
        let relative = fs_path
            .strip_prefix(&self.root)
            .ok()
            .and_then(|rel| VaultPath::from_relative(rel).ok());
        match relative {
            Some(path) => {
                warn!(%path, error = %err, "Unreadable path in vault");
                listing.issues.push(ListingIssue {
                    path,
                    message: err.to_string(),
                });
            }
            None => warn!(path = ?fs_path, error = %err, "Unreadable path in vault"),
        }
    }
}

/// Modification time in epoch milliseconds
fn modified_ms(metadata: &std::fs::Metadata) -> std::io::Result<i64> {
    let modified = metadata.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
    Ok(since_epoch.as_millis() as i64)
}

/// Attaches a [`StoreError`] to the I/O errors the engine reacts to
fn classify_io(err: std::io::Error, path: &VaultPath) -> anyhow::Error {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_string()).into(),
        ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_string()).into(),
        _ => anyhow::Error::new(err).context(format!("I/O error on {path}")),
    }
}

#[async_trait::async_trait]
impl ILocalStore for VaultFileSystem {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list(&self) -> anyhow::Result<LocalListing> {
        let mut listing = LocalListing::default();
        self.walk_directory(self.root.clone(), &mut listing).await?;
        listing.entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            files = listing.entries.len(),
            issues = listing.issues.len(),
            "vault listed"
        );
        Ok(listing)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read_bytes(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>> {
        let data = tokio::fs::read(self.target(path))
            .await
            .map_err(|e| classify_io(e, path))?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %path, bytes = data.len(), ?mode))]
    async fn write_bytes(
        &self,
        path: &VaultPath,
        data: &[u8],
        mode: WriteMode,
    ) -> anyhow::Result<()> {
        let target = self.target(path);

        let exists = match tokio::fs::metadata(&target).await {
            Ok(metadata) if metadata.is_dir() => {
                anyhow::bail!("Cannot write {path}: a directory is in the way")
            }
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(classify_io(e, path)),
        };
        match (mode, exists) {
            (WriteMode::Create, true) => {
                return Err(StoreError::AlreadyExists(path.to_string()).into())
            }
            (WriteMode::Overwrite, false) => return Err(StoreError::NotFound(path.to_string()).into()),
            _ => {}
        }

        // Ensure parent directory exists.
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| classify_io(e, path))?;
        }

        // Write to a temporary file in the same directory so rename is atomic
        // (same filesystem).
        let tmp_path = {
            let mut p = target.as_os_str().to_owned();
            p.push(TEMP_SUFFIX);
            PathBuf::from(p)
        };

        debug!(?tmp_path, "writing to temporary file");
        if let Err(e) = tokio::fs::write(&tmp_path, data).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(classify_io(e, path));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &target).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(classify_io(e, path));
        }

        debug!("write complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &VaultPath) -> anyhow::Result<()> {
        tokio::fs::remove_file(self.target(path))
            .await
            .map_err(|e| classify_io(e, path))?;
        debug!("delete complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn stat(&self, path: &VaultPath) -> anyhow::Result<Option<LocalEntry>> {
        let metadata = match tokio::fs::metadata(self.target(path)).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(None);
            }
            Err(e) => return Err(classify_io(e, path)),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        let mtime = modified_ms(&metadata).map_err(|e| classify_io(e, path))?;
        Ok(Some(LocalEntry::new(path.clone(), mtime)))
    }
}

// ============================================================================
// Unit tests
// ============================================================================
