//! vaultsync Cache - Sync-state persistence
//!
//! Stores the per-path tie-points the reconciler loads at the start of a
//! run and checkpoints after every phase.
//!
//! ## Architecture
//!
//! This crate implements the `ISyncStateStore` port from `vaultsync-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`JsonSyncStateStore`] - Single JSON document, replaced atomically
//! - [`SqliteSyncStateStore`] - `sync_states` table in a WAL-mode SQLite file
//! - [`MemorySyncStateStore`] - In-process store for tests and dry runs
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use vaultsync_cache::SqliteSyncStateStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store =
//!     SqliteSyncStateStore::open(Path::new("/home/user/.local/share/vaultsync/state.db")).await?;
//! // Use store as ISyncStateStore...
//! # Ok(())
//! # }
//! ```

pub mod json_store;
pub mod memory_store;
pub mod sqlite_store;

pub use json_store::JsonSyncStateStore;
pub use memory_store::MemorySyncStateStore;
pub use sqlite_store::SqliteSyncStateStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Creating the `sync_states` schema failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The persisted document uses a format this build cannot read
    #[error("Unsupported state format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Reading or writing the state file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
