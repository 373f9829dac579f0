//! Events command - view sync events recorded by previous runs
//!
//! These are failures the sync protocol reported but did not act on:
//! per-partition fetch errors and scope token mismatches.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use tracing::info;
use zonesync_cache::SqliteEventLog;
use zonesync_core::config::Config;
use zonesync_core::domain::RunId;
use zonesync_core::ports::{RecordedEvent, SyncEvent};

use super::open_database;
use crate::output::{get_formatter, render_table, to_json, OutputFormat};

#[derive(Debug, Args)]
pub struct EventsCommand {
    /// Maximum number of events to show
    #[arg(long, default_value = "20")]
    pub limit: u32,

    /// Only show events of this run
    #[arg(long)]
    pub run: Option<RunId>,

    /// Only show events since this time (e.g. "1h", "2d", "2026-01-01",
    /// "2026-01-01T12:00:00Z")
    #[arg(long)]
    pub since: Option<String>,

    /// Delete events older than `--since` instead of listing
    #[arg(long, requires = "since", conflicts_with = "run")]
    pub prune: bool,
}

impl EventsCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let Some(pool) = open_database(config).await? else {
            formatter.error(&format!(
                "No database found at {}",
                config.storage.database.display()
            ));
            return Ok(());
        };
        let log = SqliteEventLog::new(pool.pool().clone());

        let since = self
            .since
            .as_deref()
            .map(parse_since)
            .transpose()
            .context(
                "Invalid --since value. Expected '1h', '30m', '2d', '1w', '2026-01-01' \
                 or an RFC 3339 timestamp",
            )?;

        if self.prune {
            let cutoff = since.context("--prune needs a --since cutoff")?;
            let removed = log.prune_before(cutoff).await?;
            info!(removed, cutoff = %cutoff, "Pruned sync events");
            if format.is_json() {
                formatter.print_json(&serde_json::json!({ "removed": removed }));
            } else {
                formatter.success(&format!("Removed {} event(s)", removed));
            }
            return Ok(());
        }

        let mut events = match self.run {
            Some(run_id) => log.for_run(run_id).await?,
            None => log.recent(self.limit).await?,
        };
        if let Some(since) = since {
            events.retain(|e| e.recorded_at >= since);
        }
        events.truncate(self.limit as usize);

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "count": events.len(),
                "events": to_json(&events)?,
            }));
            return Ok(());
        }

        if events.is_empty() {
            formatter.info("No sync events recorded.");
            return Ok(());
        }

        formatter.success(&format!("Sync events ({})", events.len()));
        let rows: Vec<Vec<String>> = events.iter().map(event_row).collect();
        for line in render_table(&["Recorded", "Kind", "Where", "Error"], &rows) {
            formatter.info(&line);
        }
        Ok(())
    }
}

fn event_row(recorded: &RecordedEvent) -> Vec<String> {
    let (location, error) = match &recorded.event {
        SyncEvent::ScopeTokenMismatch { scope, error, .. } => (scope.to_string(), error),
        SyncEvent::PartitionFetchFailed {
            scope,
            partition,
            error,
            ..
        } => (format!("{}/{}", scope, partition), error),
    };
    vec![
        recorded.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        recorded.event.kind().to_string(),
        location,
        error.to_string(),
    ]
}

/// Parses "30m", "1h", "2d", "1w" (relative to now), "YYYY-MM-DD" or an
/// RFC 3339 timestamp
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(duration) = parse_relative_duration(input) {
        return Ok(Utc::now() - duration);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Ok(datetime.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let datetime = date
            .and_hms_opt(0, 0, 0)
            .context("Failed to create datetime from date")?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    anyhow::bail!("Could not parse '{}' as a time", input)
}

fn parse_relative_duration(input: &str) -> Option<chrono::Duration> {
    let (split, _) = input.char_indices().last()?;
    let (num_str, unit) = input.split_at(split);
    if num_str.is_empty() {
        return None;
    }
    let num: i64 = num_str.parse().ok()?;

    match unit {
        "m" => Some(chrono::Duration::minutes(num)),
        "h" => Some(chrono::Duration::hours(num)),
        "d" => Some(chrono::Duration::days(num)),
        "w" => Some(chrono::Duration::weeks(num)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use zonesync_cache::DatabasePool;
    use zonesync_core::domain::{PartitionName, ScopeKind};
    use zonesync_core::ports::RemoteError;

    use super::*;

    fn partition_failure() -> SyncEvent {
        SyncEvent::PartitionFetchFailed {
            run_id: RunId::new(),
            scope: ScopeKind::Shared,
            partition: PartitionName::new("feed".to_string()).unwrap(),
            error: RemoteError::new(4, "network failure"),
        }
    }

    #[test]
    fn test_parse_relative_duration() {
        assert_eq!(parse_relative_duration("30m"), Some(chrono::Duration::minutes(30)));
        assert_eq!(parse_relative_duration("2d"), Some(chrono::Duration::days(2)));
        assert_eq!(parse_relative_duration("1w"), Some(chrono::Duration::weeks(1)));
        assert_eq!(parse_relative_duration("5x"), None);
        assert_eq!(parse_relative_duration("h"), None);
        assert_eq!(parse_relative_duration(""), None);
    }

    #[test]
    fn test_parse_relative_duration_multibyte_unit() {
        assert_eq!(parse_relative_duration("3é"), None);
        assert!(parse_since("3é").is_err());
    }

    #[test]
    fn test_parse_since_rfc3339() {
        let dt = parse_since("2026-01-01T12:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-01T12:00:00+00:00");

        let offset = parse_since("2026-01-01T12:00:00+02:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2026-01-01T10:00:00+00:00");
    }

    #[derive(Debug, Parser)]
    struct EventsArgs {
        #[command(flatten)]
        events: EventsCommand,
    }

    #[test]
    fn test_prune_requires_since() {
        assert!(EventsArgs::try_parse_from(["events", "--prune"]).is_err());
        let run_id = RunId::new().to_string();
        assert!(EventsArgs::try_parse_from([
            "events", "--prune", "--since", "1h", "--run", run_id.as_str(),
        ])
        .is_err());

        let args = EventsArgs::try_parse_from(["events", "--prune", "--since", "30d"]).unwrap();
        assert!(args.events.prune);
        assert_eq!(args.events.since.as_deref(), Some("30d"));
    }

    #[tokio::test]
    async fn test_prune_deletes_events_recorded_before_since() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database = dir.path().join("state.db");

        let pool = DatabasePool::new(&config.storage.database).await.unwrap();
        let log = SqliteEventLog::new(pool.pool().clone());
        log.append(&partition_failure()).await.unwrap();

        let keep = EventsArgs::try_parse_from([
            "events", "--prune", "--since", "2000-01-01T00:00:00Z",
        ])
        .unwrap();
        keep.events.execute(&config, OutputFormat::Json).await.unwrap();
        assert_eq!(log.recent(10).await.unwrap().len(), 1);

        let prune = EventsArgs::try_parse_from([
            "events", "--prune", "--since", "2999-01-01T00:00:00Z",
        ])
        .unwrap();
        prune.events.execute(&config, OutputFormat::Json).await.unwrap();
        assert!(log.recent(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_parse_since_date() {
        let dt = parse_since("2026-01-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(parse_since("yesterday").is_err());
    }

    #[test]
    fn test_event_row_for_partition_failure() {
        let recorded = RecordedEvent {
            recorded_at: Utc::now(),
            event: partition_failure(),
        };
        let row = event_row(&recorded);
        assert_eq!(row[1], "partition_fetch_failed");
        assert_eq!(row[2], "shared/feed");
        assert_eq!(row[3], "remote error 4: network failure");
    }
}
