//! Changed and deleted record notifications
//!
//! These are produced by the partition fetch and consumed once by the
//! apply step. The payload of a changed record is opaque to the sync
//! protocol and is handed to the applier untouched.

use serde::{Deserialize, Serialize};

use super::newtypes::{PartitionName, RecordId};
use super::scope::{Partition, ScopeKind};

/// A remote record that was created or modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Record name within its partition
    pub id: RecordId,
    /// Scope the record lives in
    pub scope: ScopeKind,
    /// Partition the record lives in
    pub partition: PartitionName,
    /// Application-level record type
    pub record_type: String,
    /// Server change tag, if the service reports one
    pub change_tag: Option<String>,
    /// Record fields as delivered by the service
    pub payload: serde_json::Value,
}

impl ChangeRecord {
    /// Returns the partition this record belongs to
    pub fn partition_ref(&self) -> Partition {
        Partition::new(self.scope, self.partition.clone())
    }
}

/// A remote record that was deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionMarker {
    /// Record name within its partition
    pub id: RecordId,
    /// Scope the record lived in
    pub scope: ScopeKind,
    /// Partition the record lived in
    pub partition: PartitionName,
    /// Application-level record type
    pub record_type: String,
}

impl DeletionMarker {
    /// Returns the partition this marker belongs to
    pub fn partition_ref(&self) -> Partition {
        Partition::new(self.scope, self.partition.clone())
    }
}

/// Changed and deleted records collected during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changed: Vec<ChangeRecord>,
    pub deleted: Vec<DeletionMarker>,
}

impl ChangeSet {
    /// Creates an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing changed
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Total number of notifications (changed + deleted)
    pub fn len(&self) -> usize {
        self.changed.len() + self.deleted.len()
    }

    /// Changed records that belong to the given partition
    pub fn changed_in<'a>(
        &'a self,
        partition: &'a Partition,
    ) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.changed
            .iter()
            .filter(move |r| r.scope == partition.scope() && &r.partition == partition.name())
    }

    /// Deletion markers that belong to the given partition
    pub fn deleted_in<'a>(
        &'a self,
        partition: &'a Partition,
    ) -> impl Iterator<Item = &'a DeletionMarker> + 'a {
        self.deleted
            .iter()
            .filter(move |d| d.scope == partition.scope() && &d.partition == partition.name())
    }
}
