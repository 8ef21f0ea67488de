//! Directory-backed remote object store
//!
//! Implements [`IRemoteStore`] on top of a plain directory, typically a
//! mounted share:
//!
//! ```text
//! <root>/
//!   index.json        object metadata, keyed by id
//!   objects/<uuid>    object content
//! ```
//!
//! The store assigns ids (UUID v4), `modified_time` (wall clock at upload,
//! millisecond precision) and a SHA-256 content hash, the same way a
//! hosted object store would. Every operation reloads the index from disk
//! under a lock, so two processes pointed at the same root see each other's
//! writes between runs.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use vaultsync_core::domain::{RemoteEntry, RemoteId, StoreError, VaultPath, FOLDER_MIME_TYPE};
use vaultsync_core::ports::{IRemoteStore, UploadedObject};

const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectRecord {
    folder: String,
    name: VaultPath,
    mime_type: String,
    modified_time: DateTime<Utc>,
    content_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Index {
    version: u32,
    objects: BTreeMap<String, ObjectRecord>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            objects: BTreeMap::new(),
        }
    }
}

/// [`IRemoteStore`] that keeps objects in a local directory
pub struct FolderRemoteStore {
    root: PathBuf,
    folder: String,
    lock: Mutex<()>,
}

impl FolderRemoteStore {
    /// Opens (or lazily creates) a store at `root`; uploads land in `folder`
    pub fn new(root: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            folder: folder.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn object_path(&self, id: &str) -> PathBuf {
        self.root.join("objects").join(id)
    }

    async fn load_index(&self) -> anyhow::Result<Index> {
        let path = self.index_path();
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Index::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let index: Index = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt remote index {}", path.display()))?;
        if index.version != INDEX_VERSION {
            anyhow::bail!(
                "Unsupported remote index version {} (expected {})",
                index.version,
                INDEX_VERSION
            );
        }
        Ok(index)
    }

    async fn save_index(&self, index: &Index) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(index).context("Failed to encode remote index")?;
        write_atomic(&self.index_path(), &json).await
    }
}

async fn write_atomic(target: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = target.with_extension("tmp");
    tokio::fs::write(&tmp, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, target)
        .await
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    Ok(())
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn to_entry(id: &str, record: &ObjectRecord) -> anyhow::Result<RemoteEntry> {
    Ok(RemoteEntry {
        id: RemoteId::new(id.to_string())?,
        name: record.name.clone(),
        mime_type: record.mime_type.clone(),
        modified_time: record.modified_time,
        content_hash: Some(record.content_hash.clone()),
    })
}

/// Every ancestor directory of the listed objects, as folder entries
fn folder_entries(objects: &[RemoteEntry]) -> Vec<RemoteEntry> {
    let mut folders: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
    for object in objects {
        let mut parent = object.name.parent();
        while let Some(dir) = parent {
            let newest = folders.entry(dir.to_string()).or_insert(object.modified_time);
            if object.modified_time > *newest {
                *newest = object.modified_time;
            }
            parent = dir.rfind('/').map(|idx| &dir[..idx]);
        }
    }
    folders
        .into_iter()
        .filter_map(|(dir, modified_time)| {
            Some(RemoteEntry {
                id: RemoteId::new(format!("folder:{dir}")).ok()?,
                name: VaultPath::new(dir).ok()?,
                mime_type: FOLDER_MIME_TYPE.to_string(),
                modified_time,
                content_hash: None,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl IRemoteStore for FolderRemoteStore {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list(&self, folder: &str) -> anyhow::Result<Vec<RemoteEntry>> {
        let _guard = self.lock.lock().await;
        let index = self.load_index().await?;

        let objects = index
            .objects
            .iter()
            .filter(|(_, record)| record.folder == folder)
            .map(|(id, record)| to_entry(id, record))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut entries = folder_entries(&objects);
        entries.extend(objects);
        debug!(entries = entries.len(), "remote folder listed");
        Ok(entries)
    }

    #[instrument(skip(self, data), fields(path = %path, bytes = data.len()))]
    async fn upload(
        &self,
        path: &VaultPath,
        data: &[u8],
        mime_type: &str,
        existing_id: Option<&RemoteId>,
    ) -> anyhow::Result<UploadedObject> {
        let _guard = self.lock.lock().await;
        let mut index = self.load_index().await?;

        let id = match existing_id {
            Some(id) if index.objects.contains_key(id.as_str()) => id.as_str().to_string(),
            Some(id) => return Err(StoreError::NotFound(format!("remote object {id}")).into()),
            None => Uuid::new_v4().to_string(),
        };

        write_atomic(&self.object_path(&id), data).await?;

        let modified_time = Utc::now()
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or_else(|_| Utc::now());
        let record = ObjectRecord {
            folder: self.folder.clone(),
            name: path.clone(),
            mime_type: mime_type.to_string(),
            modified_time,
            content_hash: content_hash(data),
        };
        let entry = to_entry(&id, &record)?;
        index.objects.insert(id.clone(), record);
        self.save_index(&index).await?;

        debug!(id = %entry.id, "object stored");
        Ok(UploadedObject {
            id: entry.id.clone(),
            entry: Some(entry),
        })
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        let index = self.load_index().await?;
        if !index.objects.contains_key(id.as_str()) {
            return Err(StoreError::NotFound(format!("remote object {id}")).into());
        }
        let data = tokio::fs::read(self.object_path(id.as_str()))
            .await
            .with_context(|| format!("Failed to read content of {id}"))?;
        debug!(bytes = data.len(), "object read");
        Ok(data)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: &RemoteId) -> anyhow::Result<bool> {
        let _guard = self.lock.lock().await;
        let mut index = self.load_index().await?;
        if index.objects.remove(id.as_str()).is_none() {
            debug!("object already gone");
            return Ok(false);
        }
        self.save_index(&index).await?;

        match tokio::fs::remove_file(self.object_path(id.as_str())).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to remove content of {id}")),
        }
        debug!("object deleted");
        Ok(true)
    }
}
