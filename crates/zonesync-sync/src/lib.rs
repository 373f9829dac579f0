//! zonesync Sync - Token-checkpointed change synchronization
//!
//! Provides:
//! - Durable change-token bookkeeping per scope and partition
//! - Classification of remote errors into the few kinds the protocol acts on
//! - Subscription registration with partial-failure decoding
//! - Streaming scope-level and partition-level change fetches
//! - A staged orchestrator with one automatic retry on scope token expiry
//!
//! ## Modules
//!
//! - [`token_store`] - Namespaced change-token persistence
//! - [`classifier`] - Remote error code table
//! - [`subscription`] - Subscription registration and removal
//! - [`scope_fetcher`] - Changed-partition enumeration for one scope
//! - [`partition_fetcher`] - Changed/deleted record enumeration
//! - [`orchestrator`] - End-to-end sync runs and their reports
//! - [`scheduler`] - Trigger-driven, one-at-a-time run loop
//! - [`sink`] - Default `tracing`-backed event sink

pub mod classifier;
pub mod context;
pub mod orchestrator;
pub mod partition_fetcher;
pub mod scheduler;
pub mod scope_fetcher;
pub mod sink;
pub mod subscription;
pub mod token_store;

use std::collections::BTreeMap;

use thiserror::Error;
use zonesync_core::domain::Partition;
use zonesync_core::ports::RemoteError;

pub use context::{SyncContext, SyncSettings};
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncReport, SyncStage};
pub use scheduler::{SyncScheduler, SyncTrigger};
pub use token_store::{TokenEntry, TokenStore};

/// Classified failure of a sync run or one of its stages
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote account is missing, restricted or could not be determined
    #[error("Account unavailable")]
    AccountUnavailable,

    /// Some subscriptions in a registration request failed
    #[error("Subscription failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    SubscriptionPartialFailure(BTreeMap<String, RemoteError>),

    /// The scope token expired again after the automatic retry
    #[error("Scope change token expired")]
    ScopeTokenExpired,

    /// Tokens of these partitions expired; re-run to resync them
    #[error("Change tokens expired for {} partition(s)", .0.len())]
    PartitionTokensExpired(Vec<Partition>),

    /// Partition tokens expired and the fetch also failed
    #[error("Change tokens expired for {} partition(s); also: {error}", .expired.len())]
    CombinedFailure {
        expired: Vec<Partition>,
        error: Box<SyncError>,
    },

    /// Any remote error the protocol does not act on
    #[error("Transport error: {0}")]
    Transport(RemoteError),

    /// The key/value store backing the token store failed
    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    /// The application's apply step failed
    #[error("Apply failed: {0:#}")]
    ApplyFailed(anyhow::Error),
}

impl SyncError {
    /// Partitions whose token expired, if this failure carries any
    pub fn expired_partitions(&self) -> &[Partition] {
        match self {
            SyncError::PartitionTokensExpired(expired)
            | SyncError::CombinedFailure { expired, .. } => expired,
            _ => &[],
        }
    }
}
