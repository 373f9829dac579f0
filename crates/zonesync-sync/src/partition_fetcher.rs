//! Partition-level change enumeration
//!
//! Fetches changed and deleted records for many partitions in one remote
//! operation per scope. Each partition finishes on its own: an expired
//! token on one partition clears only that token and never stops the
//! others.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use zonesync_core::domain::{
    ChangeRecord, DeletionMarker, Partition, PartitionName, RunId, Scope, ScopeKind,
};
use zonesync_core::ports::{
    FetchCompletion, IChangeService, ISyncEventSink, PartitionChangeEvent,
    PartitionFetchRequest, RemoteError, SyncEvent,
};

use crate::classifier::{self, ErrorClassifier, ErrorKind};
use crate::token_store::TokenStore;
use crate::SyncError;

/// Aggregate result of a partition fetch
///
/// `error` is the operation-level failure, if the remote operation as a
/// whole failed. What to make of `expired` and `error` is the caller's
/// decision.
#[derive(Debug, Default)]
pub struct PartitionFetch {
    pub changed: Vec<ChangeRecord>,
    pub deleted: Vec<DeletionMarker>,
    pub expired: Vec<Partition>,
    pub error: Option<SyncError>,
}

impl PartitionFetch {
    /// Returns true if nothing was collected yet
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty() && self.expired.is_empty()
    }
}

/// Enumerates record changes for a set of partitions
pub struct PartitionChangeFetcher {
    service: Arc<dyn IChangeService>,
    tokens: TokenStore,
    sink: Arc<dyn ISyncEventSink>,
    max_rounds: u32,
}

impl PartitionChangeFetcher {
    pub fn new(
        service: Arc<dyn IChangeService>,
        tokens: TokenStore,
        sink: Arc<dyn ISyncEventSink>,
        max_rounds: u32,
    ) -> Self {
        Self {
            service,
            tokens,
            sink,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Fetches changes for `partitions`, each from its own stored token
    ///
    /// Returns `Err` only when the token store fails or a request cannot be
    /// issued before anything was collected. Once records or expired
    /// partitions are held, a request that cannot start is reported in
    /// [`PartitionFetch::error`] next to them. An
    /// empty list makes no remote call.
    pub async fn fetch_changes(
        &self,
        run_id: RunId,
        partitions: &[Partition],
    ) -> Result<PartitionFetch, SyncError> {
        let mut result = PartitionFetch::default();

        let mut by_scope: BTreeMap<ScopeKind, Vec<PartitionName>> = BTreeMap::new();
        let mut seen = HashSet::new();
        for partition in partitions {
            if seen.insert(partition) {
                by_scope
                    .entry(partition.scope())
                    .or_default()
                    .push(partition.name().clone());
            }
        }

        for (kind, names) in by_scope {
            self.fetch_scope(run_id, Scope::new(kind), names, &mut result)
                .await?;
            if result.error.is_some() {
                break;
            }
        }

        info!(
            changed = result.changed.len(),
            deleted = result.deleted.len(),
            expired = result.expired.len(),
            failed = result.error.is_some(),
            "Partition changes fetched"
        );
        Ok(result)
    }

    async fn fetch_scope(
        &self,
        run_id: RunId,
        scope: Scope,
        names: Vec<PartitionName>,
        result: &mut PartitionFetch,
    ) -> Result<(), SyncError> {
        let mut pending = names;

        for round in 1..=self.max_rounds {
            let mut requests = Vec::with_capacity(pending.len());
            for name in &pending {
                let token = self.tokens.get(&scope.partition(name.clone())).await?;
                requests.push(PartitionFetchRequest {
                    partition: name.clone(),
                    token,
                });
            }
            debug!(scope = %scope, round, partitions = requests.len(), "Fetching partition changes");

            let mut rx = match self.service.fetch_partition_changes(scope, requests).await {
                Ok(rx) => rx,
                Err(error) if result.is_empty() => return Err(operation_error(error)),
                Err(error) => {
                    // Expired tokens are already cleared and must still be reported
                    warn!(scope = %scope, round, error = %error, "Partition fetch could not start");
                    result.error = Some(operation_error(error));
                    return Ok(());
                }
            };

            let mut more = Vec::new();
            let operation_failure = loop {
                match rx.recv().await {
                    Some(PartitionChangeEvent::RecordChanged(record)) => result.changed.push(record),
                    Some(PartitionChangeEvent::RecordDeleted(marker)) => result.deleted.push(marker),
                    Some(PartitionChangeEvent::TokenUpdated { partition, token }) => {
                        self.tokens.set(&scope.partition(partition), &token).await?;
                    }
                    Some(PartitionChangeEvent::PartitionCompleted {
                        partition,
                        completion,
                    }) => {
                        let partition = scope.partition(partition);
                        if self
                            .complete_partition(run_id, &partition, completion, result)
                            .await?
                        {
                            more.push(partition.name().clone());
                        }
                    }
                    Some(PartitionChangeEvent::Completed { error }) => break error,
                    None => break Some(classifier::stream_closed()),
                }
            };

            if let Some(error) = operation_failure {
                warn!(scope = %scope, error = %error, "Partition fetch operation failed");
                result.error = Some(operation_error(error));
                return Ok(());
            }

            if more.is_empty() {
                return Ok(());
            }
            if round == self.max_rounds {
                warn!(
                    scope = %scope,
                    partitions = more.len(),
                    rounds = self.max_rounds,
                    "Partitions still report more changes; stopping at round limit"
                );
                return Ok(());
            }
            pending = more;
        }
        Ok(())
    }

    /// Handles one partition's terminal event; returns whether the
    /// partition has more changes to fetch
    async fn complete_partition(
        &self,
        run_id: RunId,
        partition: &Partition,
        completion: FetchCompletion,
        result: &mut PartitionFetch,
    ) -> Result<bool, SyncError> {
        match completion.error {
            Some(error) if ErrorClassifier::is_token_expired(&error) => {
                self.tokens.clear(partition).await?;
                warn!(partition = %partition, "Partition change token expired; cleared");
                if !result.expired.contains(partition) {
                    result.expired.push(partition.clone());
                }
                Ok(false)
            }
            Some(error) => {
                self.sink
                    .record(SyncEvent::PartitionFetchFailed {
                        run_id,
                        scope: partition.scope(),
                        partition: partition.name().clone(),
                        error,
                    })
                    .await;
                Ok(false)
            }
            None => {
                if let Some(token) = &completion.final_token {
                    self.tokens.set(partition, token).await?;
                }
                Ok(completion.more_coming)
            }
        }
    }
}

fn operation_error(error: RemoteError) -> SyncError {
    match ErrorClassifier::classify(&error) {
        ErrorKind::AccountUnavailable => SyncError::AccountUnavailable,
        _ => SyncError::Transport(error),
    }
}
