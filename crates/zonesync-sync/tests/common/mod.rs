//! Shared fakes for the sync integration tests
//!
//! `ScriptedService` replays queued responses and records every call, so
//! tests can assert both outcomes and the exact requests issued.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use zonesync_cache::{DatabasePool, SqliteKeyValueStore};
use zonesync_core::domain::{
    ChangeRecord, ChangeToken, DeletionMarker, PartitionName, RecordId, Scope, ScopeKind,
    SubscriptionId, SyncTarget,
};
use zonesync_core::ports::{
    AccountStatus, FetchCompletion, IChangeApplier, IChangeService, IKeyValueStore,
    ISyncEventSink, ModifiedSubscriptions, PartitionChangeEvent, PartitionFetchRequest,
    RemoteError, ScopeChangeEvent, Subscription, SyncEvent,
};
use zonesync_sync::{SyncContext, SyncSettings, TokenStore};

// ============================================================================
// Builders
// ============================================================================

pub fn token(byte: u8) -> ChangeToken {
    ChangeToken::new(vec![byte, byte, byte]).unwrap()
}

pub fn pname(name: &str) -> PartitionName {
    PartitionName::new(name.to_string()).unwrap()
}

pub fn sub_id(id: &str) -> SubscriptionId {
    SubscriptionId::new(id.to_string()).unwrap()
}

pub fn private_target() -> SyncTarget {
    SyncTarget::new(Scope::private(), sub_id("private-changes"))
}

pub fn record(partition: &str, id: &str) -> ChangeRecord {
    ChangeRecord {
        id: RecordId::new(id.to_string()).unwrap(),
        scope: ScopeKind::Private,
        partition: pname(partition),
        record_type: "Note".to_string(),
        change_tag: None,
        payload: serde_json::json!({ "title": id }),
    }
}

pub fn deletion(partition: &str, id: &str) -> DeletionMarker {
    DeletionMarker {
        id: RecordId::new(id.to_string()).unwrap(),
        scope: ScopeKind::Private,
        partition: pname(partition),
        record_type: "Note".to_string(),
    }
}

pub fn expired() -> RemoteError {
    RemoteError::new(21, "change token expired")
}

pub fn network_failure() -> RemoteError {
    RemoteError::new(4, "network failure")
}

/// Scope stream: changed partitions then a completion with `final_token`
pub fn scope_done(partitions: &[&str], final_token: ChangeToken) -> Vec<ScopeChangeEvent> {
    let mut events: Vec<_> = partitions
        .iter()
        .map(|p| ScopeChangeEvent::PartitionChanged(pname(p)))
        .collect();
    events.push(ScopeChangeEvent::Completed(FetchCompletion::done(final_token)));
    events
}

pub fn partition_done(partition: &str, final_token: ChangeToken) -> PartitionChangeEvent {
    PartitionChangeEvent::PartitionCompleted {
        partition: pname(partition),
        completion: FetchCompletion::done(final_token),
    }
}

pub fn partition_failed(partition: &str, error: RemoteError) -> PartitionChangeEvent {
    PartitionChangeEvent::PartitionCompleted {
        partition: pname(partition),
        completion: FetchCompletion::failed(error),
    }
}

pub fn operation_done() -> PartitionChangeEvent {
    PartitionChangeEvent::Completed { error: None }
}

// ============================================================================
// ScriptedService
// ============================================================================

/// A call received by [`ScriptedService`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AccountStatus,
    ModifySubscriptions {
        scope: Scope,
        save: Vec<SubscriptionId>,
        delete: Vec<SubscriptionId>,
    },
    FetchScope {
        scope: Scope,
        token: Option<ChangeToken>,
    },
    FetchPartitions {
        scope: Scope,
        requests: Vec<PartitionFetchRequest>,
    },
}

/// In-process `IChangeService` replaying queued responses
///
/// Unscripted calls succeed: the account is available, subscriptions are
/// saved, and fetches complete immediately without changes.
#[derive(Default)]
pub struct ScriptedService {
    account: Mutex<VecDeque<Result<AccountStatus, RemoteError>>>,
    modify: Mutex<VecDeque<Result<ModifiedSubscriptions, RemoteError>>>,
    scope: Mutex<VecDeque<Result<Vec<ScopeChangeEvent>, RemoteError>>>,
    partitions: Mutex<VecDeque<Result<Vec<PartitionChangeEvent>, RemoteError>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_account(&self, response: Result<AccountStatus, RemoteError>) {
        self.account.lock().unwrap().push_back(response);
    }

    pub fn push_modify(&self, response: Result<ModifiedSubscriptions, RemoteError>) {
        self.modify.lock().unwrap().push_back(response);
    }

    pub fn push_scope(&self, response: Result<Vec<ScopeChangeEvent>, RemoteError>) {
        self.scope.lock().unwrap().push_back(response);
    }

    pub fn push_partitions(&self, response: Result<Vec<PartitionChangeEvent>, RemoteError>) {
        self.partitions.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scope_calls(&self) -> Vec<Option<ChangeToken>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FetchScope { token, .. } => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn partition_calls(&self) -> Vec<Vec<PartitionFetchRequest>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FetchPartitions { requests, .. } => Some(requests),
                _ => None,
            })
            .collect()
    }

    pub fn modify_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ModifySubscriptions { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn replay<T: Send + 'static>(events: Vec<T>) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.try_send(event).expect("channel sized for the script");
    }
    rx
}

#[async_trait::async_trait]
impl IChangeService for ScriptedService {
    async fn account_status(&self) -> Result<AccountStatus, RemoteError> {
        self.record(Call::AccountStatus);
        self.account
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(AccountStatus::Available))
    }

    async fn modify_subscriptions(
        &self,
        scope: Scope,
        save: Vec<Subscription>,
        delete: Vec<SubscriptionId>,
    ) -> Result<ModifiedSubscriptions, RemoteError> {
        self.record(Call::ModifySubscriptions {
            scope,
            save: save.iter().map(|s| s.id.clone()).collect(),
            delete: delete.clone(),
        });
        self.modify
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ModifiedSubscriptions {
                saved: save,
                deleted: delete,
            }))
    }

    async fn fetch_scope_changes(
        &self,
        scope: Scope,
        token: Option<ChangeToken>,
    ) -> Result<mpsc::Receiver<ScopeChangeEvent>, RemoteError> {
        self.record(Call::FetchScope { scope, token });
        let script = self.scope.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(vec![ScopeChangeEvent::Completed(FetchCompletion::default())])
        });
        script.map(replay)
    }

    async fn fetch_partition_changes(
        &self,
        scope: Scope,
        requests: Vec<PartitionFetchRequest>,
    ) -> Result<mpsc::Receiver<PartitionChangeEvent>, RemoteError> {
        self.record(Call::FetchPartitions { scope, requests });
        let script = self
            .partitions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![operation_done()]));
        script.map(replay)
    }
}

// ============================================================================
// Sink and applier
// ============================================================================

#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ISyncEventSink for MemorySink {
    async fn record(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingApplier {
    pub fail: bool,
    calls: Mutex<Vec<(Vec<ChangeRecord>, Vec<DeletionMarker>)>>,
}

impl RecordingApplier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(Vec<ChangeRecord>, Vec<DeletionMarker>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IChangeApplier for RecordingApplier {
    async fn apply(
        &self,
        changed: &[ChangeRecord],
        deleted: &[DeletionMarker],
    ) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((changed.to_vec(), deleted.to_vec()));
        if self.fail {
            anyhow::bail!("local database is read-only");
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Everything a test needs, wired to an in-memory SQLite store
pub struct Harness {
    pub service: Arc<ScriptedService>,
    pub store: Arc<dyn IKeyValueStore>,
    pub sink: Arc<MemorySink>,
    pub applier: Arc<RecordingApplier>,
    pub settings: SyncSettings,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_applier(RecordingApplier::default()).await
    }

    pub async fn with_applier(applier: RecordingApplier) -> Self {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        Self {
            service: ScriptedService::new(),
            store: Arc::new(SqliteKeyValueStore::new(pool.pool().clone())),
            sink: Arc::new(MemorySink::default()),
            applier: Arc::new(applier),
            settings: SyncSettings::default(),
        }
    }

    pub fn context(&self) -> SyncContext {
        SyncContext::new(
            self.service.clone(),
            self.store.clone(),
            self.applier.clone(),
        )
        .with_sink(self.sink.clone())
        .with_settings(self.settings.clone())
    }

    pub fn tokens(&self) -> TokenStore {
        self.context().token_store()
    }
}
