//! Change applier port (driving the caller's apply step)
//!
//! After a successful run, the orchestrator hands the collected changes to
//! the application through this port. How records are merged into local
//! state is entirely the implementor's business.

use crate::domain::{ChangeRecord, DeletionMarker};

/// Port trait for applying fetched changes to local state
#[async_trait::async_trait]
pub trait IChangeApplier: Send + Sync {
    /// Applies one run's worth of changes
    ///
    /// Called at most once per successful run, never on failure.
    async fn apply(
        &self,
        changed: &[ChangeRecord],
        deleted: &[DeletionMarker],
    ) -> anyhow::Result<()>;
}
