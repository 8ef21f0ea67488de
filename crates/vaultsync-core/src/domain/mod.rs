//! Domain entities
//!
//! This module contains the core domain types for vaultsync:
//! - Validated newtypes for vault paths and remote identifiers
//! - Snapshot entries for both replicas
//! - The persisted per-path tie-point (`SyncState`)
//! - Plan and report types produced by a reconciliation run
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod plan;
pub mod report;
pub mod sync_state;

// Re-export commonly used types
pub use entry::{LocalEntry, RemoteEntry, FOLDER_MIME_TYPE};
pub use errors::{DomainError, StoreError};
pub use newtypes::{RemoteId, VaultPath};
pub use plan::{Direction, PlanKind, SyncPlanEntry};
pub use report::{IssueKind, RunOutcome, SyncIssue, SyncReport};
pub use sync_state::{SyncState, SyncStateMap};
