//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the reconciler
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote object store (list/upload/download/delete)
//! - [`ILocalStore`] - The local vault file tree
//! - [`ISyncStateStore`] - Persistence of the per-path tie-points

pub mod local_store;
pub mod remote_store;
pub mod sync_state_store;

pub use local_store::{ILocalStore, ListingIssue, LocalListing, WriteMode};
pub use remote_store::{IRemoteStore, UploadedObject};
pub use sync_state_store::ISyncStateStore;
