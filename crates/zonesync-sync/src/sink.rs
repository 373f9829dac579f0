//! Default sync event sink

use zonesync_core::ports::{ISyncEventSink, SyncEvent};

/// Logs every event at `warn` level and keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait::async_trait]
impl ISyncEventSink for TracingEventSink {
    async fn record(&self, event: SyncEvent) {
        match &event {
            SyncEvent::ScopeTokenMismatch {
                run_id,
                scope,
                reported,
                received,
                error,
            } => {
                tracing::warn!(
                    run_id = %run_id,
                    scope = %scope,
                    reported = ?reported.as_ref().map(|t| t.to_base64()),
                    received = ?received.as_ref().map(|t| t.to_base64()),
                    error = %error,
                    "Scope fetch failed with a final token that differs from the last reported one"
                );
            }
            SyncEvent::PartitionFetchFailed {
                run_id,
                scope,
                partition,
                error,
            } => {
                tracing::warn!(
                    run_id = %run_id,
                    scope = %scope,
                    partition = %partition,
                    error = %error,
                    "Partition fetch failed; token left unchanged"
                );
            }
        }
    }
}
