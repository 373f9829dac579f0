//! Change-token persistence
//!
//! [`TokenStore`] namespaces the keys of a [`TokenKeyed`] item with a fixed
//! prefix and keeps the token bytes in an [`IKeyValueStore`]:
//!
//! ```text
//! <prefix>.<scope>              scope token
//! <prefix>.<scope>.<partition>  partition token
//! ```
//!
//! Reading an absent token is the normal first-sync state, not an error.

use std::sync::Arc;

use serde::Serialize;
use zonesync_core::domain::{ChangeToken, PartitionName, ScopeKind, TokenKeyed};
use zonesync_core::ports::IKeyValueStore;

use crate::SyncError;

/// One stored token, as listed by [`TokenStore::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenEntry {
    /// Full storage key, including the prefix
    pub key: String,
    pub scope: ScopeKind,
    /// `None` for the scope's own token
    pub partition: Option<PartitionName>,
    pub token: ChangeToken,
}

/// Durable change tokens keyed by scope/partition identity
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn IKeyValueStore>,
    prefix: String,
}

impl TokenStore {
    pub fn new(store: Arc<dyn IKeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full storage key for `item`
    pub fn key_for<T: TokenKeyed + ?Sized>(&self, item: &T) -> String {
        format!("{}.{}", self.prefix, item.token_key().as_str())
    }

    /// Reads the token of `item`
    pub async fn get<T: TokenKeyed + ?Sized>(
        &self,
        item: &T,
    ) -> Result<Option<ChangeToken>, SyncError> {
        let key = self.key_for(item);
        let bytes = self.store.get(&key).await.map_err(SyncError::Storage)?;
        bytes
            .map(|b| {
                ChangeToken::new(b).map_err(|e| {
                    SyncError::Storage(anyhow::anyhow!("Corrupt token under '{}': {}", key, e))
                })
            })
            .transpose()
    }

    /// Persists `token` for `item`; durable once this returns
    pub async fn set<T: TokenKeyed + ?Sized>(
        &self,
        item: &T,
        token: &ChangeToken,
    ) -> Result<(), SyncError> {
        let key = self.key_for(item);
        self.store
            .set(&key, token.as_bytes())
            .await
            .map_err(SyncError::Storage)?;
        tracing::trace!(key = %key, token = %token, "Persisted change token");
        Ok(())
    }

    /// Removes the token of `item`, forcing a full enumeration next time
    pub async fn clear<T: TokenKeyed + ?Sized>(&self, item: &T) -> Result<(), SyncError> {
        let key = self.key_for(item);
        self.store.remove(&key).await.map_err(SyncError::Storage)?;
        tracing::debug!(key = %key, "Cleared change token");
        Ok(())
    }

    /// Lists every stored scope and partition token
    ///
    /// Other entries sharing the prefix (such as subscription marks) are
    /// skipped.
    pub async fn list(&self) -> Result<Vec<TokenEntry>, SyncError> {
        let namespace = format!("{}.", self.prefix);
        let entries = self
            .store
            .list_prefix(&namespace)
            .await
            .map_err(SyncError::Storage)?;

        let mut tokens = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some((scope, partition)) = parse_key(&key[namespace.len()..]) else {
                continue;
            };
            let Ok(token) = ChangeToken::new(value) else {
                tracing::warn!(key = %key, "Skipping empty token value");
                continue;
            };
            tokens.push(TokenEntry {
                key,
                scope,
                partition,
                token,
            });
        }
        Ok(tokens)
    }
}

/// Splits an unprefixed key into scope and optional partition name
fn parse_key(rest: &str) -> Option<(ScopeKind, Option<PartitionName>)> {
    match rest.split_once('.') {
        None => rest.parse().ok().map(|scope| (scope, None)),
        Some((scope, partition)) => {
            let scope = scope.parse().ok()?;
            let partition = PartitionName::new(partition.to_string()).ok()?;
            Some((scope, Some(partition)))
        }
    }
}
