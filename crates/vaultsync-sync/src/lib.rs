//! vaultsync Sync - Three-way reconciliation engine
//!
//! Provides:
//! - Snapshot collection over both stores
//! - Pure per-path classification against the last tie-point
//! - Phase-ordered execution with a checkpoint after every phase
//! - Conflict backups that keep both versions
//!
//! ## Modules
//!
//! - [`classify`] - Upload and download decision tables
//! - [`planner`] - Builds the per-run plan from snapshots and tie-points
//! - [`engine`] - The [`Reconciler`](engine::Reconciler) that executes a plan
//! - [`filesystem`] - Local vault adapter (atomic writes, exclusion globs)
//! - [`remote_folder`] - Directory-backed remote object store

pub mod classify;
pub mod clock;
pub mod conflict;
pub mod engine;
pub mod filesystem;
pub mod mime;
pub mod planner;
pub mod remote_folder;
pub mod retry;
pub mod snapshot;

use thiserror::Error;

pub use engine::{Reconciler, ReconcilerOptions};
pub use planner::SyncPlan;

/// Errors that prevent a run from starting
///
/// Everything that goes wrong once a run is underway ends up in the
/// [`SyncReport`](vaultsync_core::domain::SyncReport) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another run holds the reconciler
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    /// The sync-state store could not be read
    #[error("Failed to load sync state: {0}")]
    StateLoad(String),
}
