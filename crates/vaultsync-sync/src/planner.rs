//! Run planning
//!
//! [`SyncPlan::build`] turns one [`Snapshot`] and the loaded tie-points into
//! the per-phase task lists the reconciler executes. Planning never touches
//! a store, so the same function backs dry runs.
//!
//! ## Claiming
//!
//! The upload pass runs first. A path it claims (new, update or conflict)
//! is not looked at again by the download pass, and a path claimed by
//! either pass is never a deletion candidate. A conflict claims the path
//! for both directions: the local bytes go to a backup and the remote
//! version is forced onto the original name.

use std::collections::BTreeSet;

use tracing::debug;

use vaultsync_core::domain::{
    Direction, LocalEntry, PlanKind, RemoteEntry, RemoteId, SyncPlanEntry, SyncState,
    SyncStateMap, VaultPath,
};

use crate::classify::{classify_download, classify_upload, DownloadDecision, UploadDecision};
use crate::snapshot::Snapshot;

/// Upload local content, creating or overwriting a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub path: VaultPath,
    pub local: LocalEntry,
    /// Object to overwrite: the tie-point id for updates, or a same-named
    /// remote object for first uploads
    pub existing_id: Option<RemoteId>,
    /// `New` or `Update`
    pub kind: PlanKind,
}

/// Preserve the local bytes of a conflicting path under a backup name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictTask {
    pub path: VaultPath,
    pub local: LocalEntry,
    /// Remote version that replaces the local file once it is backed up
    pub remote: RemoteEntry,
}

/// Write remote content to the local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub path: VaultPath,
    pub remote: RemoteEntry,
    /// `New`, `Update` or `Conflict`
    pub kind: PlanKind,
}

/// Propagate a local deletion: remove the remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRemoteTask {
    pub path: VaultPath,
    pub remote_id: RemoteId,
}

/// Propagate a remote deletion: remove the local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteLocalTask {
    pub path: VaultPath,
    pub tie_point: SyncState,
}

/// Everything one run intends to do, phase by phase
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub conflicts: Vec<ConflictTask>,
    pub uploads: Vec<UploadTask>,
    pub downloads: Vec<DownloadTask>,
    pub delete_remote: Vec<DeleteRemoteTask>,
    pub delete_local: Vec<DeleteLocalTask>,
    /// Tie-points that named a different object than the remote listing
    pub repairs: Vec<VaultPath>,
    /// One entry per classified path, sorted by path
    pub entries: Vec<SyncPlanEntry>,
}

impl SyncPlan {
    /// Classifies every path in the snapshot
    pub fn build(snapshot: &Snapshot, states: &SyncStateMap) -> Self {
        let mut plan = Self::default();
        let mut claimed: BTreeSet<VaultPath> = BTreeSet::new();
        let mut corrupt: BTreeSet<VaultPath> = BTreeSet::new();

        // upload direction
        for (path, local) in &snapshot.local {
            if snapshot.is_unreadable(path) {
                continue;
            }
            let remote = snapshot.remote.get(path);
            let mut sync = states.get(path);

            if let (Some(s), Some(r)) = (sync, remote) {
                if s.remote_id != r.id {
                    debug!(
                        %path,
                        recorded = %s.remote_id,
                        listed = %r.id,
                        "tie-point names a different remote object"
                    );
                    corrupt.insert(path.clone());
                    plan.repairs.push(path.clone());
                    sync = None;
                }
            }

            let decision = classify_upload(local, remote, sync);
            debug!(%path, ?decision, "upload classification");
            match decision {
                UploadDecision::New => {
                    claimed.insert(path.clone());
                    match remote {
                        Some(r) if r.modified_ms() > local.mtime => {
                            plan.push_conflict(path, local, r, "untracked on both sides, remote is newer");
                        }
                        Some(r) => {
                            plan.uploads.push(UploadTask {
                                path: path.clone(),
                                local: local.clone(),
                                existing_id: Some(r.id.clone()),
                                kind: PlanKind::New,
                            });
                            plan.note(
                                path,
                                Direction::Upload,
                                PlanKind::New,
                                "untracked on both sides, local is not older",
                            );
                        }
                        None => {
                            plan.uploads.push(UploadTask {
                                path: path.clone(),
                                local: local.clone(),
                                existing_id: None,
                                kind: PlanKind::New,
                            });
                            plan.note(path, Direction::Upload, PlanKind::New, "previously unseen file");
                        }
                    }
                }
                UploadDecision::Update => {
                    claimed.insert(path.clone());
                    plan.uploads.push(UploadTask {
                        path: path.clone(),
                        local: local.clone(),
                        existing_id: sync.map(|s| s.remote_id.clone()),
                        kind: PlanKind::Update,
                    });
                    plan.note(
                        path,
                        Direction::Upload,
                        PlanKind::Update,
                        "local modified since last sync",
                    );
                }
                UploadDecision::Conflict => {
                    claimed.insert(path.clone());
                    if let Some(r) = remote {
                        plan.push_conflict(path, local, r, "both sides modified since last sync");
                    }
                }
                UploadDecision::Unchanged | UploadDecision::Deferred => {}
            }
        }

        // download direction
        for (path, remote) in &snapshot.remote {
            if claimed.contains(path)
                || snapshot.is_unreadable(path)
                || snapshot.is_excluded(path)
            {
                continue;
            }
            let local = snapshot.local.get(path);
            let sync = if corrupt.contains(path) {
                None
            } else {
                states.get(path)
            };

            let decision = classify_download(remote, local, sync);
            debug!(%path, ?decision, "download classification");
            let (kind, reason) = match decision {
                DownloadDecision::New if sync.is_some() => {
                    (PlanKind::New, "remote modified after local delete")
                }
                DownloadDecision::New => (PlanKind::New, "not present locally"),
                DownloadDecision::Update => (PlanKind::Update, "remote modified since last sync"),
                DownloadDecision::Unchanged => {
                    plan.note(path, Direction::None, PlanKind::Unchanged, "in sync");
                    continue;
                }
                DownloadDecision::LocalNewer => {
                    plan.note(path, Direction::None, PlanKind::Unchanged, "local copy is newer");
                    continue;
                }
                DownloadDecision::SameInstant => {
                    plan.note(path, Direction::None, PlanKind::Unchanged, "identical timestamps");
                    continue;
                }
                DownloadDecision::DeletedLocally => continue,
            };
            claimed.insert(path.clone());
            plan.downloads.push(DownloadTask {
                path: path.clone(),
                remote: remote.clone(),
                kind,
            });
            plan.note(path, Direction::Download, kind, reason);
        }

        // deletion candidates
        for (path, tie_point) in states {
            // an excluded file is not a deleted one; its tie-point waits
            if claimed.contains(path)
                || corrupt.contains(path)
                || snapshot.is_unreadable(path)
                || snapshot.is_excluded(path)
            {
                continue;
            }
            let local = snapshot.local.get(path);
            let remote = snapshot.remote.get(path);
            match (local, remote) {
                (None, _) => {
                    plan.delete_remote.push(DeleteRemoteTask {
                        path: path.clone(),
                        remote_id: tie_point.remote_id.clone(),
                    });
                    plan.note(path, Direction::Upload, PlanKind::Delete, "deleted locally");
                }
                (Some(_), None) => {
                    plan.delete_local.push(DeleteLocalTask {
                        path: path.clone(),
                        tie_point: tie_point.clone(),
                    });
                    plan.note(path, Direction::Download, PlanKind::Delete, "deleted remotely");
                }
                (Some(_), Some(_)) => {}
            }
        }

        plan.entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            conflicts = plan.conflicts.len(),
            uploads = plan.uploads.len(),
            downloads = plan.downloads.len(),
            delete_remote = plan.delete_remote.len(),
            delete_local = plan.delete_local.len(),
            repairs = plan.repairs.len(),
            "plan built"
        );
        plan
    }

    /// True if executing the plan would not touch either store
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
            && self.uploads.is_empty()
            && self.downloads.is_empty()
            && self.delete_remote.is_empty()
            && self.delete_local.is_empty()
    }

    /// Entries that change something
    pub fn actionable(&self) -> impl Iterator<Item = &SyncPlanEntry> {
        self.entries.iter().filter(|e| e.is_actionable())
    }

    fn push_conflict(
        &mut self,
        path: &VaultPath,
        local: &LocalEntry,
        remote: &RemoteEntry,
        reason: &str,
    ) {
        self.conflicts.push(ConflictTask {
            path: path.clone(),
            local: local.clone(),
            remote: remote.clone(),
        });
        self.downloads.push(DownloadTask {
            path: path.clone(),
            remote: remote.clone(),
            kind: PlanKind::Conflict,
        });
        self.note(path, Direction::Download, PlanKind::Conflict, reason);
    }

    fn note(&mut self, path: &VaultPath, direction: Direction, kind: PlanKind, reason: &str) {
        self.entries
            .push(SyncPlanEntry::new(path.clone(), direction, kind, reason));
    }
}
