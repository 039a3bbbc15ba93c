//! Integration tests for start-up reconciliation.

use crate::common::easy_run;
use chrono::{NaiveDate, Utc};
use paceline::calendar::{shift_weeks, week_start};
use paceline::identity::{IdentityProvider, LocalIdentity};
use paceline::storage::{FlagStore, LocalStore};
use paceline::sync::{
    Collection, DocumentPath, DocumentStore, MemoryDocumentStore, PhaseOutcome,
    ReconciliationManager, RemoteMirror,
};
use paceline::{Gender, RaceGoal, UserProfile, WeeklyAchievement, WeeklyTarget};
use serde_json::json;
use std::sync::Arc;

struct Setup {
    local: Arc<LocalStore>,
    remote: Arc<MemoryDocumentStore>,
    mirror: RemoteMirror,
    flags: Arc<FlagStore>,
    manager: ReconciliationManager,
}

fn setup(user_id: &str) -> Setup {
    let local = Arc::new(LocalStore::open_in_memory().unwrap());
    let remote = Arc::new(MemoryDocumentStore::new());
    let flags = Arc::new(FlagStore::in_memory());
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(LocalIdentity::new(flags.clone(), Some(user_id.to_string())));
    let mirror = RemoteMirror::new(remote.clone(), identity);
    let manager = ReconciliationManager::new(local.clone(), mirror.clone(), flags.clone());
    Setup {
        local,
        remote,
        mirror,
        flags,
        manager,
    }
}

/// Seed the remote copy through the mirror so documents have the real layout.
async fn seed_remote(mirror: &RemoteMirror) {
    mirror.save_profile(&UserProfile::new("Ana", Gender::Female, 34)).await.unwrap();
    mirror.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();

    let now = Utc::now();
    for (id, minutes) in [(3, 30), (8, 45)] {
        let run = easy_run(now, minutes).with_id(id);
        mirror.save_run(&run).await.unwrap();
    }

    let previous = shift_weeks(week_start(now), -1);
    mirror
        .save_achievement(&WeeklyAchievement::settle(previous, 180, 200, now))
        .await
        .unwrap();
    mirror
        .save_race_goal(&RaceGoal::new("City Half", NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(), Some(6300)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_restore_into_empty_store() {
    let s = setup("u1");
    seed_remote(&s.mirror).await;

    let report = s.manager.run().await;
    assert_eq!(report.restore, PhaseOutcome::Completed);
    assert!(s.manager.is_restore_completed());

    assert_eq!(s.local.profile().map(|p| p.name), Some("Ana".to_string()));
    assert_eq!(s.local.target().map(|t| t.weekly_duration_minutes), Some(180));
    assert_eq!(s.local.race_goal().and_then(|g| g.target_time_seconds), Some(6300));
    assert_eq!(s.local.achievements().len(), 1);

    let mut ids: Vec<i64> = s.local.runs().iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, vec![3, 8]);
}

#[tokio::test]
async fn test_non_empty_store_never_restores() {
    let s = setup("u1");
    seed_remote(&s.mirror).await;
    s.local.insert_run(&easy_run(Utc::now(), 20)).await.unwrap();

    assert!(!s.manager.is_restore_completed());
    let report = s.manager.run().await;

    assert_eq!(report.restore, PhaseOutcome::Skipped("local data present"));
    assert!(!s.manager.is_restore_completed());
    assert_eq!(s.local.runs().len(), 1);
    assert!(s.local.profile().is_none());
}

#[tokio::test]
async fn test_each_singleton_makes_store_non_empty() {
    for case in 0..4 {
        let s = setup("u1");
        seed_remote(&s.mirror).await;
        match case {
            0 => s.local.save_profile(&UserProfile::new("Local", Gender::Male, 30)).await.unwrap(),
            1 => s.local.save_target(&WeeklyTarget::new(400, 310, 90)).await.unwrap(),
            2 => s
                .local
                .save_race_goal(&RaceGoal::new("Local 10K", NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), None))
                .await
                .unwrap(),
            _ => {
                s.local.insert_run(&easy_run(Utc::now(), 10)).await.unwrap();
            }
        }

        let outcome = s.manager.restore_if_local_empty().await.unwrap();
        assert_eq!(outcome, PhaseOutcome::Skipped("local data present"), "case {}", case);
    }
}

#[tokio::test]
async fn test_migration_runs_once_per_user() {
    let s = setup("u1");
    s.local.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();
    s.local.insert_run(&easy_run(Utc::now(), 30)).await.unwrap();

    let first = s.manager.run().await;
    assert_eq!(first.migration, PhaseOutcome::Completed);
    assert_eq!(s.remote.len(), 2);

    // Written locally without going through a repository: only a migration would upload it.
    s.local.insert_run(&easy_run(Utc::now(), 40)).await.unwrap();

    let second = s.manager.run().await;
    assert_eq!(second.migration, PhaseOutcome::Skipped("already migrated"));
    assert_eq!(s.remote.len(), 2);
    assert!(s.flags.get_bool("migration_completed_for_user_u1"));
}

#[tokio::test]
async fn test_migration_flag_is_per_user() {
    let remote = Arc::new(MemoryDocumentStore::new());
    let flags = Arc::new(FlagStore::in_memory());
    let local = Arc::new(LocalStore::open_in_memory().unwrap());
    local.save_target(&WeeklyTarget::new(390, 300, 180)).await.unwrap();

    for user in ["u1", "u2"] {
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(LocalIdentity::new(flags.clone(), Some(user.to_string())));
        let mirror = RemoteMirror::new(remote.clone(), identity);
        let manager = ReconciliationManager::new(local.clone(), mirror, flags.clone());
        assert_eq!(manager.run().await.migration, PhaseOutcome::Completed);
    }

    assert!(remote.document(&DocumentPath::current("u1", Collection::Targets)).is_some());
    assert!(remote.document(&DocumentPath::current("u2", Collection::Targets)).is_some());
}

#[tokio::test]
async fn test_failed_restore_is_retried_next_start() {
    let s = setup("u1");
    seed_remote(&s.mirror).await;
    s.remote
        .put(
            &DocumentPath::new("u1", Collection::RunLogs, "99"),
            json!({"localId": 99, "date": 0, "durationMinutes": 10, "runType": "SPRINT", "paceSecondsPerKm": 300}),
        )
        .await
        .unwrap();

    let report = s.manager.run().await;
    assert!(matches!(report.restore, PhaseOutcome::Failed(_)));
    assert!(!s.manager.is_restore_completed());

    // Profile and target were restored before the bad run document.
    assert!(s.local.profile().is_some());

    s.remote
        .delete(&DocumentPath::new("u1", Collection::RunLogs, "99"))
        .await
        .unwrap();
    // The partially restored store is no longer empty, so restore does not run again.
    assert_eq!(
        s.manager.restore_if_local_empty().await.unwrap(),
        PhaseOutcome::Skipped("local data present")
    );
}
