//! Per-path tie-points
//!
//! A [`SyncState`] records what both replicas looked like the last time a
//! path was successfully synchronized. It is the only state that survives
//! between runs. A path has an entry iff an upload or download for it
//! completed and the file has not since been removed from both sides.

use std::collections::btree_map;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RemoteId, VaultPath};

/// Last agreed-upon state of one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub remote_id: RemoteId,
    #[serde(default)]
    pub remote_mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remote_content_hash: Option<String>,
    #[serde(default)]
    pub local_mtime_epoch: Option<i64>,
}

impl SyncState {
    /// Last known remote modification time in epoch ms (epoch 0 if unknown)
    pub fn remote_mtime_ms(&self) -> i64 {
        self.remote_mtime.map_or(0, |t| t.timestamp_millis())
    }

    /// Last known local modification time in epoch ms (epoch 0 if unknown)
    pub fn local_mtime_ms(&self) -> i64 {
        self.local_mtime_epoch.unwrap_or(0)
    }
}

/// Ordered mapping from vault path to tie-point
///
/// Serializes as a plain JSON object keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncStateMap(BTreeMap<VaultPath, SyncState>);

impl SyncStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &VaultPath) -> Option<&SyncState> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &VaultPath) -> bool {
        self.0.contains_key(path)
    }

    /// Insert or replace the entry, returning the previous one
    pub fn insert(&mut self, path: VaultPath, state: SyncState) -> Option<SyncState> {
        self.0.insert(path, state)
    }

    pub fn remove(&mut self, path: &VaultPath) -> Option<SyncState> {
        self.0.remove(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, VaultPath, SyncState> {
        self.0.iter()
    }
}

impl FromIterator<(VaultPath, SyncState)> for SyncStateMap {
    fn from_iter<I: IntoIterator<Item = (VaultPath, SyncState)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SyncStateMap {
    type Item = (&'a VaultPath, &'a SyncState);
    type IntoIter = btree_map::Iter<'a, VaultPath, SyncState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
