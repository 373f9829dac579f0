//! Scope-level change enumeration
//!
//! Asks the service which partitions of a scope changed since the scope's
//! token. Every intermediate token is persisted as soon as it arrives, so
//! an interrupted fetch resumes from the last checkpoint.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zonesync_core::domain::{ChangeToken, Partition, RunId, Scope};
use zonesync_core::ports::{
    FetchCompletion, IChangeService, ISyncEventSink, RemoteError, ScopeChangeEvent, SyncEvent,
};

use crate::classifier::{self, ErrorClassifier, ErrorKind};
use crate::token_store::TokenStore;
use crate::SyncError;

/// Result of a scope fetch that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeFetch {
    /// Partitions that changed, in first-seen order
    Changed(Vec<Partition>),
    /// The token expired and has been cleared; `observed` holds what was
    /// seen before the expiry was reported
    TokenExpired { observed: Vec<Partition> },
}

/// Enumerates changed partitions of one scope
pub struct ScopeChangeFetcher {
    service: Arc<dyn IChangeService>,
    tokens: TokenStore,
    sink: Arc<dyn ISyncEventSink>,
    max_rounds: u32,
}

impl ScopeChangeFetcher {
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

    /// Fetches the partitions of `scope` that changed since its stored token
    ///
    /// An absent token requests a full enumeration. Deleted and purged
    /// partitions are not reported.
    pub async fn fetch_changed_partitions(
        &self,
        run_id: RunId,
        scope: Scope,
    ) -> Result<ScopeFetch, SyncError> {
        let mut observed = Vec::new();
        let mut seen = HashSet::new();
        let mut token = self.tokens.get(&scope).await?;

        for round in 1..=self.max_rounds {
            debug!(scope = %scope, round, has_token = token.is_some(), "Fetching scope changes");

            let mut last_known = token.clone();
            let completion = match self.service.fetch_scope_changes(scope, token.clone()).await {
                Ok(mut rx) => loop {
                    match rx.recv().await {
                        Some(ScopeChangeEvent::TokenUpdated(next)) => {
                            self.tokens.set(&scope, &next).await?;
                            last_known = Some(next);
                        }
                        Some(ScopeChangeEvent::PartitionChanged(name)) => {
                            if seen.insert(name.clone()) {
                                observed.push(scope.partition(name));
                            }
                        }
                        Some(ScopeChangeEvent::PartitionDeleted(name))
                        | Some(ScopeChangeEvent::PartitionPurged(name)) => {
                            debug!(scope = %scope, partition = %name, "Ignoring removed partition");
                        }
                        Some(ScopeChangeEvent::Completed(completion)) => break completion,
                        None => break FetchCompletion::failed(classifier::stream_closed()),
                    }
                },
                Err(error) => FetchCompletion::failed(error),
            };

            let FetchCompletion {
                final_token,
                more_coming,
                error,
            } = completion;

            if let Some(error) = error {
                let kind = ErrorClassifier::classify(&error);
                if kind == ErrorKind::TokenExpired {
                    self.tokens.clear(&scope).await?;
                    warn!(
                        scope = %scope,
                        observed = observed.len(),
                        "Scope change token expired; cleared"
                    );
                    return Ok(ScopeFetch::TokenExpired { observed });
                }

                self.report_mismatch(run_id, scope, &last_known, &final_token, &error)
                    .await;
                if let Some(final_token) = &final_token {
                    self.tokens.set(&scope, final_token).await?;
                }
                return Err(match kind {
                    ErrorKind::AccountUnavailable => SyncError::AccountUnavailable,
                    _ => SyncError::Transport(error),
                });
            }

            if let Some(final_token) = final_token {
                self.tokens.set(&scope, &final_token).await?;
                last_known = Some(final_token);
            }
            token = last_known;

            if !more_coming {
                break;
            }
            if round == self.max_rounds {
                warn!(
                    scope = %scope,
                    rounds = self.max_rounds,
                    "Service still reports more changes; stopping at round limit"
                );
            }
        }

        info!(scope = %scope, partitions = observed.len(), "Scope changes fetched");
        Ok(ScopeFetch::Changed(observed))
    }

    /// Flags a final token that arrived with an error and differs from the
    /// last one the stream reported
    async fn report_mismatch(
        &self,
        run_id: RunId,
        scope: Scope,
        last_known: &Option<ChangeToken>,
        final_token: &Option<ChangeToken>,
        error: &RemoteError,
    ) {
        if final_token.is_none() || final_token == last_known {
            return;
        }
        self.sink
            .record(SyncEvent::ScopeTokenMismatch {
                run_id,
                scope: scope.kind(),
                reported: last_known.clone(),
                received: final_token.clone(),
                error: error.clone(),
            })
            .await;
    }
}
