//! Conflict backups
//!
//! When both sides changed since the tie-point the remote version keeps
//! the original name and the local bytes are preserved next to it as
//! `<stem>_local_conflict_<timestamp>.<ext>`. The timestamp is UTC with
//! millisecond precision, with `:` and `.` replaced by `-` so the name is
//! portable.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use vaultsync_core::domain::{DomainError, StoreError, VaultPath};
use vaultsync_core::ports::{ILocalStore, WriteMode};

/// Numbered candidates tried after the plain name is taken
const MAX_SUFFIX: u32 = 99;

/// Generates backup names for conflicting local files
pub struct ConflictNamer;

impl ConflictNamer {
    /// Backup name for `original` at instant `at`
    ///
    /// Given "notes/plan.md", produces something like:
    /// "notes/plan_local_conflict_2026-03-01T10-15-30-123Z.md"
    pub fn generate(original: &VaultPath, at: DateTime<Utc>) -> Result<VaultPath, DomainError> {
        Self::candidate(original, at, 1)
    }

    /// The `n`-th candidate; `n == 1` is the plain name, later ones carry
    /// a `_<n>` suffix before the extension
    pub fn candidate(
        original: &VaultPath,
        at: DateTime<Utc>,
        n: u32,
    ) -> Result<VaultPath, DomainError> {
        let timestamp = at
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
            .replace([':', '.'], "-");

        let name = original.file_name();
        let (stem, ext) = match original.extension() {
            Some(ext) => (&name[..name.len() - ext.len() - 1], Some(ext)),
            None => (name, None),
        };

        let suffix = if n > 1 { format!("_{n}") } else { String::new() };
        let backup = match ext {
            Some(ext) => format!("{stem}_local_conflict_{timestamp}{suffix}.{ext}"),
            None => format!("{stem}_local_conflict_{timestamp}{suffix}"),
        };
        original.with_file_name(&backup)
    }
}

/// Writes `data` to a fresh backup path next to `original`
///
/// The backup is created with [`WriteMode::Create`] so an existing file is
/// never overwritten; a taken name moves on to the next numbered
/// candidate. Returns the path that was written.
#[instrument(skip(local, data), fields(path = %original, bytes = data.len()))]
pub async fn write_backup(
    local: &dyn ILocalStore,
    original: &VaultPath,
    data: &[u8],
    at: DateTime<Utc>,
) -> Result<VaultPath> {
    for n in 1..=MAX_SUFFIX {
        let candidate = ConflictNamer::candidate(original, at, n)?;
        if local.exists(&candidate).await? {
            continue;
        }
        match local.write_bytes(&candidate, data, WriteMode::Create).await {
            Ok(()) => {
                debug!(backup = %candidate, "conflict backup written");
                return Ok(candidate);
            }
            Err(err) if matches!(StoreError::find(&err), Some(StoreError::AlreadyExists(_))) => {
                continue;
            }
            Err(err) => return Err(err),
        }
    }
    Err(StoreError::AlreadyExists(format!(
        "no free conflict backup name for {original}"
    ))
    .into())
}
