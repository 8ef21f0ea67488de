//! In-process sync-state store
//!
//! Keeps the map in memory and counts checkpoints. Used by the engine
//! tests, and by dry runs that must not touch the real state file.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use vaultsync_core::domain::SyncStateMap;
use vaultsync_core::ports::ISyncStateStore;

/// [`ISyncStateStore`] that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySyncStateStore {
    states: Mutex<SyncStateMap>,
    flushes: AtomicUsize,
    fail_flushes: AtomicBool,
}

impl MemorySyncStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing map, as if it had been flushed before
    pub fn with_states(states: SyncStateMap) -> Self {
        Self {
            states: Mutex::new(states),
            ..Self::default()
        }
    }

    /// Replace the stored map without counting a flush
    pub fn set_states(&self, states: SyncStateMap) {
        if let Ok(mut current) = self.states.lock() {
            *current = states;
        }
    }

    /// The last flushed map
    pub fn snapshot(&self) -> SyncStateMap {
        self.states
            .lock()
            .map(|states| states.clone())
            .unwrap_or_default()
    }

    /// Number of successful flushes so far
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Make every following flush fail until reset
    pub fn set_fail_flushes(&self, fail: bool) {
        self.fail_flushes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ISyncStateStore for MemorySyncStateStore {
    async fn load(&self) -> anyhow::Result<SyncStateMap> {
        let states = self
            .states
            .lock()
            .map_err(|_| anyhow::anyhow!("sync state lock poisoned"))?;
        Ok(states.clone())
    }

    async fn flush(&self, states: &SyncStateMap) -> anyhow::Result<()> {
        if self.fail_flushes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated flush failure");
        }
        let mut current = self
            .states
            .lock()
            .map_err(|_| anyhow::anyhow!("sync state lock poisoned"))?;
        *current = states.clone();
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
