//! Integration tests for vaultsync-sync
//!
//! Drives the [`Reconciler`](vaultsync_sync::Reconciler) against in-memory
//! stores with fault injection, and end to end against the directory
//! adapters in a temporary directory.

mod common;

mod test_conflicts;
mod test_convergence;
