//! Per-path decision tables
//!
//! Pure functions over one path's local entry, remote entry and
//! tie-point. No I/O, no clocks: the planner feeds them immutable
//! snapshots and turns the decisions into tasks.
//!
//! All comparisons are strict `>` on millisecond timestamps. Equal
//! timestamps never trigger an action.

use vaultsync_core::domain::{LocalEntry, RemoteEntry, SyncState};

/// Outcome of looking at a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    /// No tie-point: the file was never synchronized
    New,
    /// Local moved since the tie-point, remote did not, local is newer
    Update,
    /// Both sides moved since the tie-point
    Conflict,
    /// Local has not moved since the tie-point
    Unchanged,
    /// Local moved but the remote timestamp is not older; left to the
    /// download direction
    Deferred,
}

/// Outcome of looking at a remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadDecision {
    /// No local file: fetch it
    New,
    /// Remote moved since the tie-point and is newer than the local file
    Update,
    /// Remote has not moved since the tie-point
    Unchanged,
    /// Remote moved but the local file is newer
    LocalNewer,
    /// Remote moved and both timestamps are identical
    SameInstant,
    /// Local file is gone and remote has not moved: a local deletion to
    /// propagate, not a download
    DeletedLocally,
}

impl UploadDecision {
    /// True if the path is claimed by the upload direction
    pub fn claims_path(self) -> bool {
        matches!(self, Self::New | Self::Update | Self::Conflict)
    }
}

impl DownloadDecision {
    /// True if the remote content should be written locally
    pub fn fetches(self) -> bool {
        matches!(self, Self::New | Self::Update)
    }
}

/// Classify a local file against its remote counterpart and tie-point
pub fn classify_upload(
    local: &LocalEntry,
    remote: Option<&RemoteEntry>,
    sync: Option<&SyncState>,
) -> UploadDecision {
    let Some(sync) = sync else {
        return UploadDecision::New;
    };

    if local.mtime <= sync.local_mtime_ms() {
        return UploadDecision::Unchanged;
    }

    let remote_changed = remote.is_some_and(|r| r.modified_ms() > sync.remote_mtime_ms());
    if remote_changed {
        return UploadDecision::Conflict;
    }

    match remote {
        None => UploadDecision::Update,
        Some(r) if local.mtime > r.modified_ms() => UploadDecision::Update,
        Some(_) => UploadDecision::Deferred,
    }
}

/// Classify a remote object against its local counterpart and tie-point
pub fn classify_download(
    remote: &RemoteEntry,
    local: Option<&LocalEntry>,
    sync: Option<&SyncState>,
) -> DownloadDecision {
    let last_known_remote = sync.map_or(0, SyncState::remote_mtime_ms);
    let remote_moved = remote.modified_ms() > last_known_remote;

    let Some(local) = local else {
        return match sync {
            None => DownloadDecision::New,
            Some(_) if remote_moved => DownloadDecision::New,
            Some(_) => DownloadDecision::DeletedLocally,
        };
    };

    if !remote_moved {
        return DownloadDecision::Unchanged;
    }

    let remote_ms = remote.modified_ms();
    if remote_ms > local.mtime {
        DownloadDecision::Update
    } else if remote_ms < local.mtime {
        DownloadDecision::LocalNewer
    } else {
        DownloadDecision::SameInstant
    }
}
