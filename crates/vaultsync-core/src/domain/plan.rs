//! Plan entries
//!
//! A [`SyncPlanEntry`] explains what a run intends to do with one path.
//! Entries are derived fresh from the snapshots and the tie-points on
//! every run and are never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::newtypes::VaultPath;

/// Which way data flows for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local to remote
    Upload,
    /// Remote to local
    Download,
    None,
}

/// What kind of change the plan applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    New,
    Update,
    Conflict,
    /// Propagate a deletion to the other side
    Delete,
    Unchanged,
}

/// One path's planned action and the reason for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlanEntry {
    pub path: VaultPath,
    pub direction: Direction,
    pub kind: PlanKind,
    pub reason: String,
}

impl SyncPlanEntry {
    pub fn new(
        path: VaultPath,
        direction: Direction,
        kind: PlanKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path,
            direction,
            kind,
            reason: reason.into(),
        }
    }

    /// True if executing this entry touches either store
    pub fn is_actionable(&self) -> bool {
        self.kind != PlanKind::Unchanged
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
            Direction::None => "none",
        };
        f.write_str(s)
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlanKind::New => "new",
            PlanKind::Update => "update",
            PlanKind::Conflict => "conflict",
            PlanKind::Delete => "delete",
            PlanKind::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}
