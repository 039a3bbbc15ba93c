//! Integration tests for background pushes through the training core.

use crate::common::{easy_run, harness, mid_week};
use chrono::NaiveDate;
use paceline::sync::{Collection, DocumentPath, MemoryDocumentStore};
use paceline::{Gender, RaceGoal, SyncStatus, UserProfile, WeeklyTarget};
use std::sync::Arc;

#[tokio::test]
async fn test_every_entity_is_mirrored() {
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", mid_week());

    h.core.save_profile(&UserProfile::new("Ana", Gender::Female, 34)).await.unwrap();
    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core
        .save_race_goal(&RaceGoal::new("City Half", NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(), None))
        .await
        .unwrap();
    let run = h.core.log_run(&easy_run(mid_week(), 40)).await.unwrap();
    h.core.wait_for_pending_sync().await;

    for path in [
        DocumentPath::current("u1", Collection::Profile),
        DocumentPath::current("u1", Collection::Targets),
        DocumentPath::current("u1", Collection::RaceGoal),
        DocumentPath::new("u1", Collection::RunLogs, run.id.to_string()),
    ] {
        assert!(h.remote.document(&path).is_some(), "missing {}", path);
    }
}

#[tokio::test]
async fn test_update_and_delete_follow_local_writes() {
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", mid_week());
    let mut run = h.core.log_run(&easy_run(mid_week(), 40)).await.unwrap();
    let path = DocumentPath::new("u1", Collection::RunLogs, run.id.to_string());

    run.duration_minutes = 55;
    h.core.update_run(&run).await.unwrap();
    h.core.wait_for_pending_sync().await;
    assert_eq!(h.remote.document(&path).unwrap()["durationMinutes"], 55);

    assert!(h.core.delete_run(run.id).await.unwrap());
    h.core.wait_for_pending_sync().await;
    assert!(h.remote.document(&path).is_none());
}

#[tokio::test]
async fn test_clearing_singletons_removes_remote_documents() {
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", mid_week());
    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core
        .save_race_goal(&RaceGoal::new("10K", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(), None))
        .await
        .unwrap();
    h.core.wait_for_pending_sync().await;
    assert_eq!(h.remote.len(), 2);

    assert!(h.core.clear_target().await.unwrap());
    assert!(h.core.clear_race_goal().await.unwrap());
    h.core.wait_for_pending_sync().await;

    assert!(h.remote.is_empty());
    assert!(h.core.target().is_none());
    assert!(h.core.race_goal().is_none());
}

#[tokio::test]
async fn test_remote_failure_never_fails_local_write() {
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", mid_week());
    h.core.start().await.unwrap();
    h.remote.set_failure(Some("network unreachable"));

    h.core.save_profile(&UserProfile::new("Ana", Gender::Female, 34)).await.unwrap();
    assert!(h.core.profile().is_some());

    h.core.wait_for_pending_sync().await;
    assert_eq!(
        h.core.sync_status(),
        SyncStatus::Error("Remote unavailable: network unreachable".to_string())
    );
    assert!(h.core.observe_sync_status().borrow().is_error());
}

#[tokio::test]
async fn test_next_write_resyncs_after_failure() {
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", mid_week());
    h.core.start().await.unwrap();

    h.remote.set_failure(Some("offline"));
    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.wait_for_pending_sync().await;
    assert!(h.remote.document(&DocumentPath::current("u1", Collection::Targets)).is_none());

    h.remote.set_failure(None);
    h.core.save_target(&WeeklyTarget::new(390, 300, 200)).await.unwrap();
    h.core.wait_for_pending_sync().await;

    let doc = h
        .remote
        .document(&DocumentPath::current("u1", Collection::Targets))
        .expect("target pushed on the next write");
    assert_eq!(doc["weeklyDurationMinutes"], 200);

    assert_eq!(h.core.sync_status(), SyncStatus::Success);
}
