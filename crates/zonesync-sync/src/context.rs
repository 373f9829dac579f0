//! Explicit dependencies of a sync run

use std::sync::Arc;

use zonesync_core::config::{SyncConfig, DEFAULT_TOKEN_KEY_PREFIX};
use zonesync_core::ports::{IChangeApplier, IChangeService, IKeyValueStore, ISyncEventSink};

use crate::sink::TracingEventSink;
use crate::token_store::TokenStore;

/// Protocol tunables, usually taken from the `sync` config section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub token_key_prefix: String,
    /// Requests per fetch stage while the service reports `more_coming`
    pub max_fetch_rounds: u32,
    pub cache_subscriptions: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            token_key_prefix: DEFAULT_TOKEN_KEY_PREFIX.to_string(),
            max_fetch_rounds: 16,
            cache_subscriptions: true,
        }
    }
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            token_key_prefix: config.token_key_prefix.clone(),
            max_fetch_rounds: config.max_fetch_rounds.max(1),
            cache_subscriptions: config.cache_subscriptions,
        }
    }
}

/// Collaborators and settings handed to the orchestrator
///
/// Nothing here is global; build one context per service connection and
/// share it between runs.
#[derive(Clone)]
pub struct SyncContext {
    pub service: Arc<dyn IChangeService>,
    pub store: Arc<dyn IKeyValueStore>,
    pub applier: Arc<dyn IChangeApplier>,
    pub sink: Arc<dyn ISyncEventSink>,
    pub settings: SyncSettings,
}

impl SyncContext {
    /// Creates a context with default settings and a [`TracingEventSink`]
    pub fn new(
        service: Arc<dyn IChangeService>,
        store: Arc<dyn IKeyValueStore>,
        applier: Arc<dyn IChangeApplier>,
    ) -> Self {
        Self {
            service,
            store,
            applier,
            sink: Arc::new(TracingEventSink),
            settings: SyncSettings::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ISyncEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Token store over this context's key/value store
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(self.store.clone(), self.settings.token_key_prefix.clone())
    }
}
