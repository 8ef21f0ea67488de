//! Sync-state store port (driven/secondary port)
//!
//! Persists the [`SyncStateMap`] separately from user configuration. The
//! reconciler loads it once at the start of a run, mutates its own copy,
//! and calls [`ISyncStateStore::flush`] at every phase boundary.

use crate::domain::sync_state::SyncStateMap;

/// Port trait for tie-point persistence
#[async_trait::async_trait]
pub trait ISyncStateStore: Send + Sync {
    /// Loads the full map; a store that was never flushed yields an empty map
    ///
    /// # Errors
    /// If the persisted data exists but cannot be read or parsed. A
    /// corrupt store is never reported as empty.
    async fn load(&self) -> anyhow::Result<SyncStateMap>;

    /// Replaces the persisted map with `states`, atomically
    async fn flush(&self, states: &SyncStateMap) -> anyhow::Result<()>;
}
