//! JSON file sync-state store
//!
//! The whole map is stored as one document:
//!
//! ```json
//! { "version": 1, "states": { "notes/a.md": { "remoteId": "...", ... } } }
//! ```
//!
//! Flushes write a sibling temp file and rename it over the target, so a
//! crash leaves either the previous or the new checkpoint on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use vaultsync_core::domain::SyncStateMap;
use vaultsync_core::ports::ISyncStateStore;

use crate::CacheError;

/// Current on-disk format version
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    #[serde(default)]
    states: SyncStateMap,
}

/// [`ISyncStateStore`] backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonSyncStateStore {
    path: PathBuf,
}

impl JsonSyncStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    }

    fn decode(content: &str) -> Result<SyncStateMap, CacheError> {
        let doc: StateDocument = serde_json::from_str(content)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        if doc.version != STATE_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: doc.version,
                expected: STATE_FORMAT_VERSION,
            });
        }
        Ok(doc.states)
    }
}

#[async_trait::async_trait]
impl ISyncStateStore for JsonSyncStateStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> anyhow::Result<SyncStateMap> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no state file yet, starting empty");
                return Ok(SyncStateMap::new());
            }
            Err(e) => {
                return Err(CacheError::Io(e))
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        let states = Self::decode(&content)
            .with_context(|| format!("Corrupt sync state file {}", self.path.display()))?;
        debug!(entries = states.len(), "sync state loaded");
        Ok(states)
    }

    #[instrument(skip(self, states), fields(path = %self.path.display(), entries = states.len()))]
    async fn flush(&self, states: &SyncStateMap) -> anyhow::Result<()> {
        let doc = serde_json::json!({
            "version": STATE_FORMAT_VERSION,
            "states": states,
        });
        let body = serde_json::to_vec_pretty(&doc)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(CacheError::Io)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(CacheError::Io)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(CacheError::Io)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(bytes = body.len(), "sync state flushed");
        Ok(())
    }
}
