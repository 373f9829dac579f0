//! Remote change service port (driven/secondary port)
//!
//! This module defines the interface to the remote, multi-scope change
//! service: account status, subscription management, and the two streaming
//! change enumerations (scope level and partition level).
//!
//! ## Design Notes
//!
//! - Unlike the other ports, methods return the structured [`RemoteError`]
//!   instead of `anyhow::Error`. The sync protocol has to classify remote
//!   failures by code, so the adapter must not erase them.
//! - A streaming fetch hands back an `mpsc::Receiver`. The adapter pushes
//!   progress events in delivery order and finishes with exactly one
//!   terminal `Completed` event, after which it drops its sender.
//! - Payload shapes (record fields, token bytes) are opaque here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::{
    ChangeRecord, ChangeToken, DeletionMarker, PartitionName, Scope, SubscriptionId,
};

// ============================================================================
// RemoteError
// ============================================================================

/// A raw error reported by the remote change service
///
/// `code` is the service's numeric error code. For partial failures,
/// `partial_errors` maps each failed item (e.g. a subscription ID) to its
/// own error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("remote error {code}: {message}")]
pub struct RemoteError {
    /// Service-defined numeric code
    pub code: i64,
    /// Human-readable description
    pub message: String,
    /// Per-item errors, keyed by item identity
    #[serde(default)]
    pub partial_errors: BTreeMap<String, RemoteError>,
}

impl RemoteError {
    /// Creates an error without per-item detail
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            partial_errors: BTreeMap::new(),
        }
    }

    /// Adds a per-item error
    pub fn with_item_error(mut self, item: impl Into<String>, error: RemoteError) -> Self {
        self.partial_errors.insert(item.into(), error);
        self
    }
}

// ============================================================================
// Account and subscriptions
// ============================================================================

/// Availability of the remote account for the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Signed in and usable
    Available,
    /// No account is signed in on this device
    NoAccount,
    /// The account exists but access is restricted (parental/MDM controls)
    Restricted,
    /// The service could not determine the status
    CouldNotDetermine,
}

impl AccountStatus {
    /// Returns true if the sync pipeline may proceed
    pub fn is_available(&self) -> bool {
        matches!(self, AccountStatus::Available)
    }
}

/// Delivery options for notifications raised by a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationInfo {
    /// Deliver silently so the client can fetch changes in the background
    pub content_available: bool,
}

impl NotificationInfo {
    /// Silent background notification, no user-visible alert
    pub fn silent() -> Self {
        Self {
            content_available: true,
        }
    }
}

/// A scope-wide change-notification subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Identity used by the service to deduplicate registrations
    pub id: SubscriptionId,
    /// How notifications are delivered
    pub notification: NotificationInfo,
}

impl Subscription {
    /// Creates a subscription that delivers silent notifications
    pub fn silent(id: SubscriptionId) -> Self {
        Self {
            id,
            notification: NotificationInfo::silent(),
        }
    }
}

/// Result of a successful subscription modification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedSubscriptions {
    /// Subscriptions the service saved
    pub saved: Vec<Subscription>,
    /// Subscription IDs the service deleted
    pub deleted: Vec<SubscriptionId>,
}

// ============================================================================
// Streaming fetch events
// ============================================================================

/// Terminal status of one streaming fetch (scope or single partition)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchCompletion {
    /// Token to resume from next time, if the service sent one
    pub final_token: Option<ChangeToken>,
    /// The service has more changes; issue another fetch from `final_token`
    pub more_coming: bool,
    /// Terminal error, if the fetch failed
    pub error: Option<RemoteError>,
}

impl FetchCompletion {
    /// Successful completion with a final token
    pub fn done(final_token: ChangeToken) -> Self {
        Self {
            final_token: Some(final_token),
            more_coming: false,
            error: None,
        }
    }

    /// Failed completion
    pub fn failed(error: RemoteError) -> Self {
        Self {
            final_token: None,
            more_coming: false,
            error: Some(error),
        }
    }
}

/// Event delivered by a scope-level change enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeChangeEvent {
    /// Intermediate checkpoint for the scope
    TokenUpdated(ChangeToken),
    /// A partition has changes since the seed token
    PartitionChanged(PartitionName),
    /// A partition was deleted
    PartitionDeleted(PartitionName),
    /// A partition was purged
    PartitionPurged(PartitionName),
    /// Terminal event; no further events follow
    Completed(FetchCompletion),
}

/// One partition of a partition-level fetch, with the token to resume from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFetchRequest {
    /// Partition to enumerate
    pub partition: PartitionName,
    /// Previous token (`None` requests every record)
    pub token: Option<ChangeToken>,
}

/// Event delivered by a partition-level change enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionChangeEvent {
    /// A record was created or modified
    RecordChanged(ChangeRecord),
    /// A record was deleted
    RecordDeleted(DeletionMarker),
    /// Intermediate checkpoint for one partition
    TokenUpdated {
        partition: PartitionName,
        token: ChangeToken,
    },
    /// Terminal event for one partition; the others may still be running
    PartitionCompleted {
        partition: PartitionName,
        completion: FetchCompletion,
    },
    /// Terminal event for the whole operation; no further events follow
    Completed { error: Option<RemoteError> },
}

// ============================================================================
// IChangeService trait
// ============================================================================

/// Port trait for the remote change service
///
/// ## Implementation Notes
///
/// - Stream receivers must eventually yield a terminal `Completed` event.
///   A channel that closes without one is treated as a transport failure.
/// - A returned `Err` means the request could not be issued at all.
#[async_trait::async_trait]
pub trait IChangeService: Send + Sync {
    /// Queries whether the user's account is usable
    async fn account_status(&self) -> Result<AccountStatus, RemoteError>;

    /// Saves and/or deletes subscriptions in one request
    ///
    /// A partial failure is reported as an error whose `partial_errors`
    /// are keyed by subscription ID.
    async fn modify_subscriptions(
        &self,
        scope: Scope,
        save: Vec<Subscription>,
        delete: Vec<SubscriptionId>,
    ) -> Result<ModifiedSubscriptions, RemoteError>;

    /// Enumerates partitions of `scope` that changed since `token`
    ///
    /// `None` requests a full enumeration.
    async fn fetch_scope_changes(
        &self,
        scope: Scope,
        token: Option<ChangeToken>,
    ) -> Result<mpsc::Receiver<ScopeChangeEvent>, RemoteError>;

    /// Enumerates record changes for several partitions in one operation
    async fn fetch_partition_changes(
        &self,
        scope: Scope,
        requests: Vec<PartitionFetchRequest>,
    ) -> Result<mpsc::Receiver<PartitionChangeEvent>, RemoteError>;
}
