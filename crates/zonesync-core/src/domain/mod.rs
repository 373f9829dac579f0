//! Domain entities
//!
//! This module contains the core domain types for zonesync:
//! - Newtypes for type-safe identifiers and opaque change tokens
//! - Scopes, partitions and token key derivation
//! - Changed-record and deletion notifications
//! - Domain-specific error types

pub mod change;
pub mod errors;
pub mod newtypes;
pub mod scope;

// Re-export commonly used types
pub use change::{ChangeRecord, ChangeSet, DeletionMarker};
pub use errors::DomainError;
pub use newtypes::*;
pub use scope::{Partition, Scope, ScopeKind, SyncTarget, TokenKeyed};
