//! Sync event sink port (driven/secondary port)
//!
//! Receives failures that the sync protocol classifies but deliberately
//! does not act on. Recording an event never changes the outcome of a run.
//!
//! ## Design Notes
//!
//! - `record` returns nothing: implementations swallow their own errors
//!   (logging them through `tracing`) so the sink can never break a sync.
//! - Each unhandled situation is a named variant so tests can assert that
//!   it was reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChangeToken, PartitionName, RunId, ScopeKind};
use crate::ports::change_service::RemoteError;

/// A classified failure that the sync protocol reports but does not handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A scope fetch failed with a non-expiry error and the final token
    /// differs from the last token the stream reported
    ScopeTokenMismatch {
        run_id: RunId,
        scope: ScopeKind,
        /// Last token known before the terminal event (seed or intermediate)
        reported: Option<ChangeToken>,
        /// Final token received with the error
        received: Option<ChangeToken>,
        error: RemoteError,
    },
    /// One partition of a batch failed with a non-expiry error
    PartitionFetchFailed {
        run_id: RunId,
        scope: ScopeKind,
        partition: PartitionName,
        error: RemoteError,
    },
}

impl SyncEvent {
    /// Stable short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::ScopeTokenMismatch { .. } => "scope_token_mismatch",
            SyncEvent::PartitionFetchFailed { .. } => "partition_fetch_failed",
        }
    }

    /// Run that produced the event
    pub fn run_id(&self) -> RunId {
        match self {
            SyncEvent::ScopeTokenMismatch { run_id, .. }
            | SyncEvent::PartitionFetchFailed { run_id, .. } => *run_id,
        }
    }
}

/// A sink event with the time it was recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub recorded_at: DateTime<Utc>,
    pub event: SyncEvent,
}

/// Port trait for observing unhandled sync failures
#[async_trait::async_trait]
pub trait ISyncEventSink: Send + Sync {
    /// Records one event; must not fail the caller
    async fn record(&self, event: SyncEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = SyncEvent::PartitionFetchFailed {
            run_id: RunId::new(),
            scope: ScopeKind::Private,
            partition: PartitionName::new("inbox".to_string()).unwrap(),
            error: RemoteError::new(4, "network failure"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "partition_fetch_failed");
        assert_eq!(json["partition"], "inbox");

        let parsed: SyncEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.kind(), "partition_fetch_failed");
    }
}
