//! vaultsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `VaultPath`, `LocalEntry`, `RemoteEntry`, `SyncState`, `SyncReport`
//! - **Port definitions** - Traits for adapters: `ILocalStore`, `IRemoteStore`, `ISyncStateStore`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains plain data with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The reconciliation engine in `vaultsync-sync` drives the ports.

pub mod config;
pub mod domain;
pub mod ports;
