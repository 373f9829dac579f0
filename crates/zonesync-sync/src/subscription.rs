//! Change-notification subscriptions
//!
//! Registration is idempotent on the service side (it deduplicates by ID).
//! With caching enabled, a successful registration is also remembered in
//! the key/value store so later runs skip the remote call entirely.

use std::sync::Arc;

use tracing::{debug, info};
use zonesync_core::domain::{Scope, SubscriptionId};
use zonesync_core::ports::{IChangeService, IKeyValueStore, RemoteError, Subscription};

use crate::classifier::{ErrorClassifier, ErrorKind};
use crate::SyncError;

/// Registers and removes subscriptions for a scope
pub struct SubscriptionManager {
    service: Arc<dyn IChangeService>,
    store: Arc<dyn IKeyValueStore>,
    prefix: String,
    cache_enabled: bool,
}

impl SubscriptionManager {
    pub fn new(
        service: Arc<dyn IChangeService>,
        store: Arc<dyn IKeyValueStore>,
        prefix: impl Into<String>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            service,
            store,
            prefix: prefix.into(),
            cache_enabled,
        }
    }

    fn cache_key(&self, scope: Scope, id: &SubscriptionId) -> String {
        format!("{}.subscription.{}.{}", self.prefix, scope, id)
    }

    /// Makes sure a silent-notification subscription `id` exists on `scope`
    ///
    /// No retry happens here; a failed registration is returned as is.
    pub async fn ensure_subscription(
        &self,
        scope: Scope,
        id: &SubscriptionId,
    ) -> Result<(), SyncError> {
        let key = self.cache_key(scope, id);
        if self.cache_enabled && self.store.get(&key).await.map_err(SyncError::Storage)?.is_some()
        {
            debug!(scope = %scope, subscription = %id, "Subscription already registered");
            return Ok(());
        }

        self.service
            .modify_subscriptions(scope, vec![Subscription::silent(id.clone())], Vec::new())
            .await
            .map_err(decode)?;

        info!(scope = %scope, subscription = %id, "Subscription registered");

        if self.cache_enabled {
            self.store
                .set(&key, id.as_str().as_bytes())
                .await
                .map_err(SyncError::Storage)?;
        }
        Ok(())
    }

    /// Deletes subscription `id` from `scope` and forgets the cache mark
    pub async fn remove_subscription(
        &self,
        scope: Scope,
        id: &SubscriptionId,
    ) -> Result<(), SyncError> {
        self.service
            .modify_subscriptions(scope, Vec::new(), vec![id.clone()])
            .await
            .map_err(decode)?;

        self.store
            .remove(&self.cache_key(scope, id))
            .await
            .map_err(SyncError::Storage)?;

        info!(scope = %scope, subscription = %id, "Subscription removed");
        Ok(())
    }
}

fn decode(error: RemoteError) -> SyncError {
    match ErrorClassifier::classify(&error) {
        ErrorKind::PartialFailure(items) => SyncError::SubscriptionPartialFailure(items),
        ErrorKind::AccountUnavailable => SyncError::AccountUnavailable,
        ErrorKind::TokenExpired | ErrorKind::Transport(_) => SyncError::Transport(error),
    }
}
