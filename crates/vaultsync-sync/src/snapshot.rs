//! Point-in-time listings of both stores
//!
//! A run looks at each store exactly once. Everything the planner decides
//! is derived from these two maps and the loaded tie-points.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use vaultsync_core::domain::{IssueKind, LocalEntry, RemoteEntry, SyncIssue, VaultPath};
use vaultsync_core::ports::{ILocalStore, IRemoteStore};

use crate::retry::{with_retry, RetryPolicy};

/// Both listings plus the paths the local listing could not inspect
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub local: BTreeMap<VaultPath, LocalEntry>,
    pub remote: BTreeMap<VaultPath, RemoteEntry>,
    /// Files or directories whose state is unknown this run
    pub unreadable: Vec<VaultPath>,
    /// One `TransientIo` issue per unreadable path
    pub issues: Vec<SyncIssue>,
    /// Local files or directories matched by an exclusion pattern
    pub excluded: Vec<VaultPath>,
}

impl Snapshot {
    /// True if `path` is, or lies beneath, an unreadable path
    pub fn is_unreadable(&self, path: &VaultPath) -> bool {
        self.unreadable.iter().any(|u| path.is_within(u))
    }

    /// True if `path` is, or lies beneath, an excluded local path
    pub fn is_excluded(&self, path: &VaultPath) -> bool {
        self.excluded.iter().any(|e| path.is_within(e))
    }

    /// Builds a snapshot from already-collected entries
    pub fn from_entries(
        local: impl IntoIterator<Item = LocalEntry>,
        remote: impl IntoIterator<Item = RemoteEntry>,
    ) -> Self {
        let mut snapshot = Self {
            local: local.into_iter().map(|e| (e.path.clone(), e)).collect(),
            ..Self::default()
        };
        for entry in remote {
            snapshot.insert_remote(entry);
        }
        snapshot
    }

    /// Adds a remote entry; folders are dropped and duplicate names keep
    /// the most recently modified object
    fn insert_remote(&mut self, entry: RemoteEntry) {
        if entry.is_folder() {
            return;
        }
        match self.remote.entry(entry.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                let newer = entry.modified_time > slot.get().modified_time;
                warn!(
                    path = %entry.name,
                    first = %slot.get().id,
                    second = %entry.id,
                    replaced = newer,
                    "Duplicate remote objects for one path, keeping the newest"
                );
                if newer {
                    slot.insert(entry);
                }
            }
        }
    }
}

/// Lists both stores
///
/// # Errors
/// If either listing fails as a whole. A remote listing is never used
/// partially.
#[instrument(skip(local, remote, retry))]
pub async fn collect(
    local: &dyn ILocalStore,
    remote: &dyn IRemoteStore,
    remote_folder: &str,
    retry: &RetryPolicy,
) -> Result<Snapshot> {
    let listing = local.list().await.context("Failed to list local vault")?;

    let remote_entries = with_retry(retry, "list_remote", || remote.list(remote_folder))
        .await
        .context("Failed to list remote store")?;

    let mut snapshot = Snapshot::from_entries(listing.entries, remote_entries);
    for issue in listing.issues {
        warn!(path = %issue.path, error = %issue.message, "Unreadable local path");
        snapshot.issues.push(SyncIssue::for_path(
            issue.path.clone(),
            IssueKind::TransientIo,
            issue.message,
        ));
        snapshot.unreadable.push(issue.path);
    }
    snapshot.excluded = listing.excluded;

    debug!(
        local = snapshot.local.len(),
        remote = snapshot.remote.len(),
        unreadable = snapshot.unreadable.len(),
        "snapshot collected"
    );
    Ok(snapshot)
}
