//! zonesync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Scope`, `Partition`, `ChangeToken`, `ChangeRecord`, `DeletionMarker`, `SyncEvent`
//! - **Port definitions** - Traits for adapters: `IChangeService`, `IKeyValueStore`,
//!   `IChangeApplier`, `ISyncEventSink`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module holds plain data with validation and no I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! protocol itself lives in `zonesync-sync` and talks to the outside world
//! only through these ports.

pub mod config;
pub mod domain;
pub mod ports;
