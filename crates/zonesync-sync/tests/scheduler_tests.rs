//! Tests for the trigger-driven scheduler

mod common;

use std::time::Duration;

use common::*;
use tokio::sync::mpsc;
use zonesync_core::domain::{Scope, SyncTarget};
use zonesync_sync::{SyncOrchestrator, SyncScheduler, SyncTrigger};

fn targets() -> Vec<SyncTarget> {
    vec![
        private_target(),
        SyncTarget::new(Scope::shared(), sub_id("shared-changes")),
    ]
}

fn scheduler(h: &Harness, rx: mpsc::Receiver<SyncTrigger>, poll: Duration) -> SyncScheduler {
    SyncScheduler::new(SyncOrchestrator::new(h.context()), targets(), rx, poll)
}

#[tokio::test]
async fn test_notification_selects_matching_target_only() {
    let h = Harness::new().await;
    let (_tx, rx) = mpsc::channel(4);
    let scheduler = scheduler(&h, rx, Duration::from_secs(3600));

    let selected = scheduler.targets_for(&[SyncTrigger::Notification {
        subscription_id: sub_id("shared-changes"),
    }]);
    assert_eq!(selected, vec![targets()[1].clone()]);

    let unknown = scheduler.targets_for(&[SyncTrigger::Notification {
        subscription_id: sub_id("nobody"),
    }]);
    assert!(unknown.is_empty());

    assert_eq!(scheduler.targets_for(&[SyncTrigger::Manual]), targets());
}

#[tokio::test]
async fn test_run_exits_on_channel_close() {
    let h = Harness::new().await;
    let (tx, rx) = mpsc::channel(4);
    let mut scheduler = scheduler(&h, rx, Duration::from_secs(3600));

    drop(tx);

    let runs = tokio::time::timeout(Duration::from_secs(2), scheduler.run())
        .await
        .expect("Scheduler should exit when channel closes");
    assert_eq!(runs, 0);
    assert!(h.service.calls().is_empty());
}

#[tokio::test]
async fn test_burst_of_triggers_is_coalesced() {
    let h = Harness::new().await;
    let (tx, rx) = mpsc::channel(8);
    let (report_tx, mut report_rx) = mpsc::channel(8);
    let mut scheduler =
        scheduler(&h, rx, Duration::from_secs(3600)).with_reports(report_tx);

    tx.send(SyncTrigger::Manual).await.unwrap();
    tx.send(SyncTrigger::Manual).await.unwrap();
    tx.send(SyncTrigger::Notification {
        subscription_id: sub_id("private-changes"),
    })
    .await
    .unwrap();
    drop(tx);

    let runs = scheduler.run().await;

    // One pass over both targets
    assert_eq!(runs, 2);
    let mut reports = Vec::new();
    while let Ok(report) = report_rx.try_recv() {
        reports.push(report);
    }
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome.is_done()));
}

#[tokio::test]
async fn test_notification_runs_only_its_target() {
    let h = Harness::new().await;
    let (tx, rx) = mpsc::channel(4);
    let mut scheduler = scheduler(&h, rx, Duration::from_secs(3600));

    tx.send(SyncTrigger::Notification {
        subscription_id: sub_id("shared-changes"),
    })
    .await
    .unwrap();
    drop(tx);

    assert_eq!(scheduler.run().await, 1);
    assert_eq!(h.service.scope_calls().len(), 1);
    assert!(h.service.calls().iter().any(|c| matches!(
        c,
        Call::FetchScope { scope, .. } if *scope == Scope::shared()
    )));
}

#[tokio::test]
async fn test_poll_interval_triggers_runs() {
    let h = Harness::new().await;
    let (tx, rx) = mpsc::channel::<SyncTrigger>(4);
    let mut scheduler = scheduler(&h, rx, Duration::from_millis(50));

    let handle = tokio::spawn(async move { scheduler.run().await });

    tokio::time::sleep(Duration::from_millis(180)).await;
    drop(tx);
    let runs = handle.await.unwrap();

    // Every poll is a full pass over both targets
    assert!(runs >= 2, "expected at least one poll, got {runs} runs");
    assert_eq!(runs % 2, 0);
}
