//! Sync orchestrator
//!
//! The [`SyncOrchestrator`] sequences one end-to-end run for a target:
//!
//! ```text
//! CheckingAccount -> Subscribing -> FetchingScopeChanges
//!                 -> [FetchingScopeChanges (retry)] -> FetchingPartitionChanges
//!                 -> Done | Failed
//! ```
//!
//! No stage starts before the previous one has fully completed. A scope
//! token expiry is retried exactly once with a full enumeration; expired
//! partition tokens are not retried and end the run so the caller can
//! sync again.
//!
//! The orchestrator keeps no state between runs beyond what the token
//! store persists. It does not serialize runs: callers must not run two
//! syncs for the same target at the same time (see
//! [`SyncScheduler`](crate::scheduler::SyncScheduler)).

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use zonesync_core::domain::{ChangeSet, Partition, RunId, SyncTarget};
use zonesync_core::ports::AccountStatus;

use crate::classifier::{ErrorClassifier, ErrorKind};
use crate::context::SyncContext;
use crate::partition_fetcher::PartitionChangeFetcher;
use crate::scope_fetcher::{ScopeChangeFetcher, ScopeFetch};
use crate::subscription::SubscriptionManager;
use crate::SyncError;

// ============================================================================
// Stages, outcomes and reports
// ============================================================================

/// A state of the run state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SyncStage {
    CheckingAccount,
    Subscribing,
    /// `attempt` is 1 for the first fetch and 2 for the retry after expiry
    FetchingScopeChanges { attempt: u8 },
    FetchingPartitionChanges,
    Done,
    Failed,
}

/// Terminal result of one run
///
/// A failed run still carries whatever records were fetched before the
/// failure.
#[derive(Debug)]
pub enum SyncOutcome {
    Done(ChangeSet),
    Failed { error: SyncError, partial: ChangeSet },
}

impl SyncOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, SyncOutcome::Done(_))
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Done(_) => None,
            SyncOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// Changes fetched by the run, complete or partial
    pub fn changes(&self) -> &ChangeSet {
        match self {
            SyncOutcome::Done(changes) => changes,
            SyncOutcome::Failed { partial, .. } => partial,
        }
    }
}

/// Summary of one run
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: RunId,
    pub target: SyncTarget,
    /// Every stage entered, in order, ending with `Done` or `Failed`
    pub stages: Vec<SyncStage>,
    pub outcome: SyncOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SyncReport {
    /// Number of scope fetch attempts made (0, 1 or 2)
    pub fn scope_attempts(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, SyncStage::FetchingScopeChanges { .. }))
            .count()
    }
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Runs the staged sync protocol for one target at a time
pub struct SyncOrchestrator {
    context: SyncContext,
    subscriptions: SubscriptionManager,
    scope_fetcher: ScopeChangeFetcher,
    partition_fetcher: PartitionChangeFetcher,
}

impl SyncOrchestrator {
    pub fn new(context: SyncContext) -> Self {
        let settings = &context.settings;
        let subscriptions = SubscriptionManager::new(
            context.service.clone(),
            context.store.clone(),
            settings.token_key_prefix.clone(),
            settings.cache_subscriptions,
        );
        let scope_fetcher = ScopeChangeFetcher::new(
            context.service.clone(),
            context.token_store(),
            context.sink.clone(),
            settings.max_fetch_rounds,
        );
        let partition_fetcher = PartitionChangeFetcher::new(
            context.service.clone(),
            context.token_store(),
            context.sink.clone(),
            settings.max_fetch_rounds,
        );

        Self {
            context,
            subscriptions,
            scope_fetcher,
            partition_fetcher,
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Runs one sync for `target` and reports how it ended
    ///
    /// On `Done` the applier has received the fetched changes exactly once.
    #[tracing::instrument(skip_all, fields(target = %target))]
    pub async fn run(&self, target: &SyncTarget) -> SyncReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut stages = Vec::new();
        let mut changes = ChangeSet::new();

        info!(run_id = %run_id, "Starting sync run");

        let outcome = match self.drive(run_id, target, &mut stages, &mut changes).await {
            Ok(()) => {
                stages.push(SyncStage::Done);
                SyncOutcome::Done(changes)
            }
            Err(error) => {
                stages.push(SyncStage::Failed);
                SyncOutcome::Failed {
                    error,
                    partial: changes,
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            SyncOutcome::Done(changes) => info!(
                run_id = %run_id,
                changed = changes.changed.len(),
                deleted = changes.deleted.len(),
                duration_ms,
                "Sync run completed"
            ),
            SyncOutcome::Failed { error, partial } => warn!(
                run_id = %run_id,
                error = %error,
                partial = partial.len(),
                duration_ms,
                "Sync run failed"
            ),
        }

        SyncReport {
            run_id,
            target: target.clone(),
            stages,
            outcome,
            started_at,
            duration_ms,
        }
    }

    /// Runs every target strictly one after another
    pub async fn run_all(&self, targets: &[SyncTarget]) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(self.run(target).await);
        }
        reports
    }

    async fn drive(
        &self,
        run_id: RunId,
        target: &SyncTarget,
        stages: &mut Vec<SyncStage>,
        changes: &mut ChangeSet,
    ) -> Result<(), SyncError> {
        let scope = target.scope;

        stages.push(SyncStage::CheckingAccount);
        self.check_account().await?;

        stages.push(SyncStage::Subscribing);
        self.subscriptions
            .ensure_subscription(scope, &target.subscription_id)
            .await?;

        stages.push(SyncStage::FetchingScopeChanges { attempt: 1 });
        let partitions = match self
            .scope_fetcher
            .fetch_changed_partitions(run_id, scope)
            .await?
        {
            ScopeFetch::Changed(partitions) => partitions,
            ScopeFetch::TokenExpired { observed } => {
                info!(
                    observed = observed.len(),
                    "Retrying scope fetch with full enumeration"
                );
                stages.push(SyncStage::FetchingScopeChanges { attempt: 2 });
                match self
                    .scope_fetcher
                    .fetch_changed_partitions(run_id, scope)
                    .await?
                {
                    ScopeFetch::Changed(partitions) => merge(observed, partitions),
                    ScopeFetch::TokenExpired { .. } => return Err(SyncError::ScopeTokenExpired),
                }
            }
        };

        stages.push(SyncStage::FetchingPartitionChanges);
        let fetch = self
            .partition_fetcher
            .fetch_changes(run_id, &partitions)
            .await?;
        changes.changed = fetch.changed;
        changes.deleted = fetch.deleted;

        match (fetch.expired.is_empty(), fetch.error) {
            (true, None) => {}
            (true, Some(error)) => return Err(error),
            (false, None) => return Err(SyncError::PartitionTokensExpired(fetch.expired)),
            (false, Some(error)) => {
                return Err(SyncError::CombinedFailure {
                    expired: fetch.expired,
                    error: Box::new(error),
                })
            }
        }

        debug!(changes = changes.len(), "Applying fetched changes");
        self.context
            .applier
            .apply(&changes.changed, &changes.deleted)
            .await
            .map_err(SyncError::ApplyFailed)
    }

    async fn check_account(&self) -> Result<(), SyncError> {
        match self.context.service.account_status().await {
            Ok(AccountStatus::Available) => Ok(()),
            Ok(status) => {
                warn!(status = ?status, "Account not available");
                Err(SyncError::AccountUnavailable)
            }
            Err(error) => match ErrorClassifier::classify(&error) {
                ErrorKind::AccountUnavailable => Err(SyncError::AccountUnavailable),
                _ => Err(SyncError::Transport(error)),
            },
        }
    }
}

/// Appends `more` to `first`, skipping partitions already present
fn merge(mut first: Vec<Partition>, more: Vec<Partition>) -> Vec<Partition> {
    for partition in more {
        if !first.contains(&partition) {
            first.push(partition);
        }
    }
    first
}
