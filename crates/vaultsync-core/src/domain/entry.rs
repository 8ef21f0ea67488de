//! Snapshot entries
//!
//! [`LocalEntry`] and [`RemoteEntry`] are ephemeral: they are rebuilt from
//! the stores on every run and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RemoteId, VaultPath};

/// MIME type remote stores use for folder objects
pub const FOLDER_MIME_TYPE: &str = "inode/directory";

/// A file in the local vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntry {
    pub path: VaultPath,
    /// Modification time in epoch milliseconds, as reported by the filesystem
    pub mtime: i64,
}

impl LocalEntry {
    pub fn new(path: VaultPath, mtime: i64) -> Self {
        Self { path, mtime }
    }
}

/// An object in the remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: RemoteId,
    /// Object name, identical to the vault-relative path
    pub name: VaultPath,
    pub mime_type: String,
    /// Server-assigned modification time
    pub modified_time: DateTime<Utc>,
    pub content_hash: Option<String>,
}

impl RemoteEntry {
    /// True for folder objects, which never take part in reconciliation
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// `modified_time` in epoch milliseconds
    pub fn modified_ms(&self) -> i64 {
        self.modified_time.timestamp_millis()
    }
}
