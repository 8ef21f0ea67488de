//! Remote store port (driven/secondary port)
//!
//! This module defines the interface for the remote object store that
//! mirrors the vault. Transport, authentication and wire encoding are the
//! adapter's concern; the reconciler only needs four operations.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific. Adapters attach a
//!   [`StoreError`](crate::domain::StoreError) when the failure is an
//!   authentication problem, a missing object, or a transient fault.
//! - Uses `#[async_trait]` for async trait methods.
//! - Object names are vault-relative paths; folders are reported with
//!   [`FOLDER_MIME_TYPE`](crate::domain::FOLDER_MIME_TYPE).

use crate::domain::entry::RemoteEntry;
use crate::domain::newtypes::{RemoteId, VaultPath};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Identifier of the created or overwritten object
    pub id: RemoteId,
    /// Definitive metadata, if the store returned it with the upload
    pub entry: Option<RemoteEntry>,
}

/// Port trait for the remote object store
///
/// ## Implementation Notes
///
/// - `list` is all-or-nothing: a partial listing must be reported as an
///   error, never returned, because missing entries read as deletions.
/// - `upload` with `existing_id` overwrites that object in place; with
///   `None` it creates a new object. Overwriting an id that does not
///   exist must fail with `StoreError::NotFound`.
/// - `delete` returns `Ok(false)` if the object was already gone.
/// - Timeouts are the adapter's responsibility.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists every entry in `folder`, including subfolder entries
    async fn list(&self, folder: &str) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Uploads the full content of `path`
    ///
    /// # Arguments
    /// * `path` - Object name (vault-relative path)
    /// * `data` - Complete file contents
    /// * `mime_type` - Content type inferred from the extension
    /// * `existing_id` - Object to overwrite, if any
    async fn upload(
        &self,
        path: &VaultPath,
        data: &[u8],
        mime_type: &str,
        existing_id: Option<&RemoteId>,
    ) -> anyhow::Result<UploadedObject>;

    /// Downloads an object's complete content
    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>>;

    /// Deletes an object; `Ok(false)` if it did not exist
    async fn delete(&self, id: &RemoteId) -> anyhow::Result<bool>;
}
