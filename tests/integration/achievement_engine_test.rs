//! Integration tests for weekly settlement and the live streak.

use crate::common::{easy_run, harness, mid_week};
use chrono::Duration as ChronoDuration;
use paceline::calendar::{shift_weeks, week_start};
use paceline::goals::SettleOutcome;
use paceline::sync::{Collection, DocumentPath, MemoryDocumentStore};
use paceline::{WeeklyAchievement, WeeklyTarget};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

async fn wait_for_streak(rx: &mut watch::Receiver<u32>, expected: u32) {
    let reached = timeout(Duration::from_secs(5), rx.wait_for(|streak| *streak == expected))
        .await
        .is_ok_and(|r| r.is_ok());
    assert!(reached, "streak never reached {}, last {}", expected, *rx.borrow());
}

#[tokio::test]
async fn test_settlement_is_idempotent() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let previous = shift_weeks(week_start(now), -1);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.log_run(&easy_run(previous + ChronoDuration::days(1), 120)).await.unwrap();

    let first = h.core.start().await.unwrap();
    assert!(matches!(first.settlement, SettleOutcome::Recorded(_)));

    let second = h.core.start().await.unwrap();
    assert_eq!(second.settlement, SettleOutcome::AlreadySettled);

    let rows = h.local.achievements();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].week_start, previous);
    assert_eq!(rows[0].actual_minutes, 120);
    assert!(!rows[0].goal_achieved);
}

#[tokio::test]
async fn test_settled_row_is_not_recomputed() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let previous = shift_weeks(week_start(now), -1);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.log_run(&easy_run(previous, 100)).await.unwrap();
    h.core.start().await.unwrap();

    // A late run for last week does not flip the frozen outcome.
    h.core.log_run(&easy_run(previous + ChronoDuration::hours(1), 100)).await.unwrap();
    h.core.start().await.unwrap();

    let row = h.local.achievement(previous).await.unwrap().unwrap();
    assert_eq!(row.actual_minutes, 100);
    assert!(!row.goal_achieved);
}

#[tokio::test]
async fn test_settled_week_is_mirrored() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let previous = shift_weeks(week_start(now), -1);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.log_run(&easy_run(previous, 200)).await.unwrap();
    h.core.start().await.unwrap();
    h.core.wait_for_pending_sync().await;

    let key = previous.timestamp_millis().to_string();
    let doc = h
        .remote
        .document(&DocumentPath::new("u1", Collection::Achievements, key))
        .expect("achievement document");
    assert_eq!(doc["goalAchieved"], true);
    assert_eq!(doc["actualMinutes"], 200);
}

#[tokio::test]
async fn test_streak_rises_live_as_runs_are_logged() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let current = week_start(now);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.local
        .save_achievement(&WeeklyAchievement::settle(shift_weeks(current, -1), 180, 190, current))
        .await
        .unwrap();

    h.core.start().await.unwrap();
    let mut streak = h.core.observe_streak();
    wait_for_streak(&mut streak, 1).await;

    h.core.log_run(&easy_run(current + ChronoDuration::hours(8), 100)).await.unwrap();
    assert_eq!(h.core.current_streak(), 1);

    h.core.log_run(&easy_run(current + ChronoDuration::hours(30), 80)).await.unwrap();
    assert_eq!(h.core.current_week_minutes().await.unwrap(), 180);
    wait_for_streak(&mut streak, 2).await;
}

#[tokio::test]
async fn test_streak_reacts_to_target_and_deletes() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let current = week_start(now);

    h.core.start().await.unwrap();
    let run = h.core.log_run(&easy_run(current, 200)).await.unwrap();

    let mut streak = h.core.observe_streak();
    wait_for_streak(&mut streak, 0).await;

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    wait_for_streak(&mut streak, 1).await;

    h.core.delete_run(run.id).await.unwrap();
    wait_for_streak(&mut streak, 0).await;
}

#[tokio::test]
async fn test_genuine_miss_is_not_repaired_by_current_week() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let current = week_start(now);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.log_run(&easy_run(shift_weeks(current, -1), 100)).await.unwrap();
    h.core.log_run(&easy_run(current, 200)).await.unwrap();

    let report = h.core.start().await.unwrap();
    assert!(matches!(report.settlement, SettleOutcome::Recorded(ref row) if !row.goal_achieved));
    assert_eq!(h.core.current_streak(), 0);
}

#[tokio::test]
async fn test_inactive_week_is_recorded_but_does_not_break() {
    let now = mid_week();
    let h = harness(Arc::new(MemoryDocumentStore::new()), "u1", now);
    let current = week_start(now);

    h.core.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    h.core.log_run(&easy_run(current, 180)).await.unwrap();

    let report = h.core.start().await.unwrap();
    match report.settlement {
        SettleOutcome::Recorded(row) => {
            assert_eq!(row.actual_minutes, 0);
            assert!(!row.goal_achieved);
        }
        other => panic!("expected inactive week to be recorded, got {:?}", other),
    }
    assert_eq!(h.core.current_streak(), 1);
}
