//! zonesync Cache - Local state persistence
//!
//! SQLite-based storage for:
//! - Change tokens and the subscription cache (as opaque key/value blobs)
//! - Sync events the protocol reported but did not handle
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` and `ISyncEventSink` ports
//! from `zonesync-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteKeyValueStore`] - `IKeyValueStore` implementation
//! - [`SqliteEventLog`] - `ISyncEventSink` implementation with a query side
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use zonesync_cache::{DatabasePool, SqliteKeyValueStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/zonesync/state.db")).await?;
//! let store = SqliteKeyValueStore::new(pool.pool().clone());
//! // Hand `store` to the token store as an IKeyValueStore...
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod kv;
pub mod pool;

pub use events::SqliteEventLog;
pub use kv::SqliteKeyValueStore;
pub use pool::DatabasePool;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of stored values failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
