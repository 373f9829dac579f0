//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync protocol
//! depends on, but whose implementations live in adapter crates or in the
//! embedding application.
//!
//! ## Ports Overview
//!
//! - [`IChangeService`] - The remote change service (account, subscriptions, fetches)
//! - [`IKeyValueStore`] - Durable blob storage backing the token store
//! - [`IChangeApplier`] - The application's apply step for fetched changes
//! - [`ISyncEventSink`] - Observer for classified-but-unhandled failures

pub mod applier;
pub mod change_service;
pub mod event_sink;
pub mod key_value;

pub use applier::IChangeApplier;
pub use change_service::{
    AccountStatus, FetchCompletion, IChangeService, ModifiedSubscriptions, NotificationInfo,
    PartitionChangeEvent, PartitionFetchRequest, RemoteError, ScopeChangeEvent, Subscription,
};
pub use event_sink::{ISyncEventSink, RecordedEvent, SyncEvent};
pub use key_value::IKeyValueStore;
