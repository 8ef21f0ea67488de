//! Run report
//!
//! Every reconciliation run ends with a [`SyncReport`], even when paths
//! failed or the run stopped early.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::newtypes::VaultPath;

/// Classification of a problem recorded during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Single-path read/write/network failure; retried next run
    TransientIo,
    /// Credentials rejected; the run stops issuing remote calls
    Auth,
    /// A tie-point referenced a remote object that no longer resolves
    StateCorruption,
    /// The local backup of a conflicting file could not be written
    ConflictBackup,
    /// A checkpoint of the sync-state map failed
    StatePersistence,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::TransientIo => "transient_io",
            IssueKind::Auth => "auth",
            IssueKind::StateCorruption => "state_corruption",
            IssueKind::ConflictBackup => "conflict_backup",
            IssueKind::StatePersistence => "state_persistence",
        };
        f.write_str(s)
    }
}

/// One recorded problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIssue {
    /// Affected path, or `None` for run-level failures
    pub path: Option<VaultPath>,
    pub kind: IssueKind,
    pub message: String,
}

impl SyncIssue {
    pub fn for_path(path: VaultPath, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: Some(path),
            kind,
            message: message.into(),
        }
    }

    pub fn run_level(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: None,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.kind, path, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All phases ran (individual paths may still have failed)
    #[default]
    Completed,
    /// Cancellation was requested; stopped at a phase boundary
    Cancelled,
    /// Stopped early because no further progress was possible
    Aborted(String),
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: u32,
    pub downloaded: u32,
    /// Local files removed because their remote object was deleted
    pub deleted_local: u32,
    /// Remote objects removed because their local file was deleted
    pub deleted_remote: u32,
    pub conflicts: u32,
    pub errors: Vec<SyncIssue>,
    /// Paths whose tie-point pointed at a vanished remote object
    pub state_repairs: Vec<VaultPath>,
    pub outcome: RunOutcome,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn push_issue(&mut self, issue: SyncIssue) {
        self.errors.push(issue);
    }

    /// Number of changes applied to either store
    pub fn total_changes(&self) -> u32 {
        self.uploaded + self.downloaded + self.deleted_local + self.deleted_remote
    }

    /// Completed without any recorded issue
    pub fn is_clean(&self) -> bool {
        self.outcome == RunOutcome::Completed && self.errors.is_empty()
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|issue| issue.kind == kind)
    }
}
