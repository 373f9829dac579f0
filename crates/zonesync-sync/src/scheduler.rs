//! Sync scheduler - turns triggers into sync runs
//!
//! The [`SyncScheduler`] receives [`SyncTrigger`]s from an mpsc channel
//! (remote notifications, manual requests) and also polls on a fixed
//! interval. Triggers that arrive while a run is in progress are coalesced
//! into a single follow-up pass.
//!
//! ## Flow
//!
//! ```text
//! notification/manual ──→ mpsc::Receiver ──→ SyncScheduler ──→ SyncOrchestrator
//!                                                 │
//!                                            poll interval
//! ```
//!
//! Every run happens on the scheduler's own task, one at a time, so two
//! runs never touch the same tokens concurrently.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use zonesync_core::domain::{SubscriptionId, SyncTarget};

use crate::orchestrator::{SyncOrchestrator, SyncReport};

/// Reason to start a sync pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The service signalled changes for this subscription
    Notification { subscription_id: SubscriptionId },
    /// Periodic poll
    Poll,
    /// User-initiated "sync now"
    Manual,
}

/// Runs the orchestrator for configured targets whenever a trigger arrives
pub struct SyncScheduler {
    orchestrator: SyncOrchestrator,
    targets: Vec<SyncTarget>,
    trigger_rx: mpsc::Receiver<SyncTrigger>,
    poll_interval: Duration,
    report_tx: Option<mpsc::Sender<SyncReport>>,
}

impl SyncScheduler {
    /// Creates a new `SyncScheduler`
    ///
    /// # Arguments
    /// * `orchestrator` - Runs the individual syncs
    /// * `targets` - Targets synchronized on poll and manual triggers
    /// * `trigger_rx` - Channel of incoming triggers; closing it stops the loop
    /// * `poll_interval` - Time between periodic polls
    pub fn new(
        orchestrator: SyncOrchestrator,
        targets: Vec<SyncTarget>,
        trigger_rx: mpsc::Receiver<SyncTrigger>,
        poll_interval: Duration,
    ) -> Self {
        info!(
            targets = targets.len(),
            poll_secs = poll_interval.as_secs(),
            "Creating sync scheduler"
        );

        Self {
            orchestrator,
            targets,
            trigger_rx,
            poll_interval,
            report_tx: None,
        }
    }

    /// Forwards every finished [`SyncReport`] to `tx`
    pub fn with_reports(mut self, tx: mpsc::Sender<SyncReport>) -> Self {
        self.report_tx = Some(tx);
        self
    }

    /// Targets selected by a batch of triggers, in configuration order
    ///
    /// A notification selects only the targets with a matching
    /// subscription; poll and manual triggers select all of them.
    pub fn targets_for(&self, triggers: &[SyncTrigger]) -> Vec<SyncTarget> {
        if triggers
            .iter()
            .any(|t| matches!(t, SyncTrigger::Poll | SyncTrigger::Manual))
        {
            return self.targets.clone();
        }
        self.targets
            .iter()
            .filter(|target| {
                triggers.iter().any(|t| {
                    matches!(t, SyncTrigger::Notification { subscription_id }
                        if *subscription_id == target.subscription_id)
                })
            })
            .cloned()
            .collect()
    }

    /// Main loop; returns the number of runs performed
    ///
    /// Terminates when the trigger channel is closed (all senders
    /// dropped), after handling triggers still buffered in it.
    pub async fn run(&mut self) -> usize {
        info!("Sync scheduler starting");

        let start = tokio::time::Instant::now() + self.poll_interval;
        let mut poll_timer = tokio::time::interval_at(start, self.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut runs = 0;

        loop {
            let triggers = tokio::select! {
                trigger = self.trigger_rx.recv() => match trigger {
                    Some(first) => {
                        let mut batch = vec![first];
                        while let Ok(next) = self.trigger_rx.try_recv() {
                            batch.push(next);
                        }
                        batch
                    }
                    None => {
                        info!("Trigger channel closed, scheduler shutting down");
                        break;
                    }
                },
                _ = poll_timer.tick() => vec![SyncTrigger::Poll],
            };

            runs += self.dispatch(&triggers).await;
        }

        info!(runs, "Sync scheduler stopped");
        runs
    }

    async fn dispatch(&self, triggers: &[SyncTrigger]) -> usize {
        let targets = self.targets_for(triggers);
        debug!(
            triggers = triggers.len(),
            targets = targets.len(),
            "Dispatching sync pass"
        );

        for target in &targets {
            let report = self.orchestrator.run(target).await;
            if let Some(tx) = &self.report_tx {
                if tx.send(report).await.is_err() {
                    debug!("Report receiver dropped");
                }
            }
        }
        targets.len()
    }
}
