//! Durable key/value port (driven/secondary port)
//!
//! The token store persists change tokens through this interface. Values
//! are opaque byte blobs; keys are plain strings namespaced by the caller.
//!
//! ## Implementation Notes
//!
//! - `set` and `remove` must not return until the change is durable: a
//!   later `get` for the same key, even after a process restart, has to
//!   observe it.
//! - `get` of a missing key is `Ok(None)`, never an error.

/// Port trait for a durable string-keyed blob store
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Reads the value stored under `key`
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    /// Removes `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Lists all entries whose key starts with `prefix`, ordered by key
    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Vec<u8>)>>;
}
