//! Persistent log of sync events
//!
//! [`SqliteEventLog`] is both an `ISyncEventSink` (the orchestrator writes
//! to it) and a small query API used by the CLI to show what went wrong
//! in recent runs.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, sqlite::SqlitePool, Row};
use zonesync_core::domain::RunId;
use zonesync_core::ports::{ISyncEventSink, RecordedEvent, SyncEvent};

use crate::CacheError;

/// Event log on the `sync_events` table
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Creates an event log using the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends one event
    pub async fn append(&self, event: &SyncEvent) -> Result<(), CacheError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO sync_events (recorded_at, kind, run_id, payload) VALUES (?, ?, ?, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(event.kind())
        .bind(event.run_id().to_string())
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns up to `limit` events, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<RecordedEvent>, CacheError> {
        let rows = sqlx::query(
            "SELECT recorded_at, payload FROM sync_events ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(recorded_event_from_row).collect()
    }

    /// Returns every event of one run, oldest first
    pub async fn for_run(&self, run_id: RunId) -> Result<Vec<RecordedEvent>, CacheError> {
        let rows = sqlx::query(
            "SELECT recorded_at, payload FROM sync_events WHERE run_id = ? ORDER BY id ASC",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(recorded_event_from_row).collect()
    }

    /// Deletes events recorded before `cutoff`, returning how many were removed
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM sync_events WHERE recorded_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn recorded_event_from_row(row: &SqliteRow) -> Result<RecordedEvent, CacheError> {
    let recorded_at: String = row.get("recorded_at");
    let payload: String = row.get("payload");

    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!(
                "Failed to parse datetime '{}': {}",
                recorded_at, e
            ))
        })?;
    let event = serde_json::from_str(&payload)
        .map_err(|e| CacheError::SerializationError(format!("Invalid event payload: {}", e)))?;

    Ok(RecordedEvent { recorded_at, event })
}

#[async_trait::async_trait]
impl ISyncEventSink for SqliteEventLog {
    async fn record(&self, event: SyncEvent) {
        if let Err(e) = self.append(&event).await {
            tracing::warn!(kind = event.kind(), error = %e, "Failed to record sync event");
        }
    }
}
