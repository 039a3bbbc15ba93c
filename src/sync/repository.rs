//! Per-entity repositories.
//!
//! Each write goes to the local store first. Only after it has committed is
//! the same entity handed to the repository's [`SyncCoordinator`]. Local
//! errors are returned to the caller; remote errors never are.

use super::coordinator::{SyncCoordinator, TaskGroup};
use super::mirror::RemoteMirror;
use super::status::SyncStatus;
use crate::goals::types::{RaceGoal, WeeklyAchievement, WeeklyTarget};
use crate::profile::UserProfile;
use crate::runs::{NewRun, RunRecord};
use crate::storage::{DatabaseError, LocalStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

// ========== Runs ==========

pub struct RunRepository {
    local: Arc<LocalStore>,
    sync: SyncCoordinator,
}

impl RunRepository {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, tasks: TaskGroup) -> Self {
        Self {
            local,
            sync: SyncCoordinator::new(mirror, tasks, "runs"),
        }
    }

    pub fn observe(&self) -> watch::Receiver<Vec<RunRecord>> {
        self.local.observe_runs()
    }

    pub fn all(&self) -> Vec<RunRecord> {
        self.local.runs()
    }

    pub async fn since(&self, since: DateTime<Utc>) -> Result<Vec<RunRecord>, DatabaseError> {
        self.local.runs_since(since).await
    }

    pub async fn total_minutes_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        self.local.total_minutes_between(start, end).await
    }

    /// Log a run. The pushed document carries the id the store assigned.
    pub async fn insert(&self, run: &NewRun) -> Result<RunRecord, DatabaseError> {
        let stored = self.local.insert_run(run).await?;
        let pushed = stored.clone();
        self.sync.push(format!("run {}", stored.id), move |mirror| async move {
            mirror.save_run(&pushed).await
        });
        Ok(stored)
    }

    pub async fn update(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        self.local.update_run(run).await?;
        let pushed = run.clone();
        self.sync.push(format!("run {}", run.id), move |mirror| async move {
            mirror.save_run(&pushed).await
        });
        Ok(())
    }

    /// Delete a run. The remote delete is sent even if the row was already gone.
    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.local.delete_run(id).await?;
        self.sync.push(format!("run {} delete", id), move |mirror| async move {
            mirror.delete_run(id).await
        });
        Ok(removed)
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.status().subscribe()
    }
}

// ========== Weekly target ==========

pub struct TargetRepository {
    local: Arc<LocalStore>,
    sync: SyncCoordinator,
}

impl TargetRepository {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, tasks: TaskGroup) -> Self {
        Self {
            local,
            sync: SyncCoordinator::new(mirror, tasks, "target"),
        }
    }

    pub fn observe(&self) -> watch::Receiver<Option<WeeklyTarget>> {
        self.local.observe_target()
    }

    pub fn current(&self) -> Option<WeeklyTarget> {
        self.local.target()
    }

    pub async fn save(&self, target: &WeeklyTarget) -> Result<(), DatabaseError> {
        self.local.save_target(target).await?;
        let pushed = target.clone();
        self.sync.push("target", move |mirror| async move {
            mirror.save_target(&pushed).await
        });
        Ok(())
    }

    pub async fn clear(&self) -> Result<bool, DatabaseError> {
        let removed = self.local.clear_target().await?;
        self.sync
            .push("target delete", |mirror| async move { mirror.delete_target().await });
        Ok(removed)
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.status().subscribe()
    }
}

// ========== Profile ==========

pub struct ProfileRepository {
    local: Arc<LocalStore>,
    sync: SyncCoordinator,
}

impl ProfileRepository {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, tasks: TaskGroup) -> Self {
        Self {
            local,
            sync: SyncCoordinator::new(mirror, tasks, "profile"),
        }
    }

    pub fn observe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.local.observe_profile()
    }

    pub fn current(&self) -> Option<UserProfile> {
        self.local.profile()
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.local.save_profile(profile).await?;
        let pushed = profile.clone();
        self.sync.push("profile", move |mirror| async move {
            mirror.save_profile(&pushed).await
        });
        Ok(())
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.status().subscribe()
    }
}

// ========== Race goal ==========

pub struct RaceGoalRepository {
    local: Arc<LocalStore>,
    sync: SyncCoordinator,
}

impl RaceGoalRepository {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, tasks: TaskGroup) -> Self {
        Self {
            local,
            sync: SyncCoordinator::new(mirror, tasks, "race goal"),
        }
    }

    pub fn observe(&self) -> watch::Receiver<Option<RaceGoal>> {
        self.local.observe_race_goal()
    }

    pub fn current(&self) -> Option<RaceGoal> {
        self.local.race_goal()
    }

    pub async fn save(&self, goal: &RaceGoal) -> Result<(), DatabaseError> {
        self.local.save_race_goal(goal).await?;
        let pushed = goal.clone();
        self.sync.push("race goal", move |mirror| async move {
            mirror.save_race_goal(&pushed).await
        });
        Ok(())
    }

    pub async fn clear(&self) -> Result<bool, DatabaseError> {
        let removed = self.local.clear_race_goal().await?;
        self.sync
            .push("race goal delete", |mirror| async move { mirror.delete_race_goal().await });
        Ok(removed)
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.status().subscribe()
    }
}

// ========== Weekly achievements ==========

pub struct AchievementRepository {
    local: Arc<LocalStore>,
    sync: SyncCoordinator,
}

impl AchievementRepository {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, tasks: TaskGroup) -> Self {
        Self {
            local,
            sync: SyncCoordinator::new(mirror, tasks, "achievements"),
        }
    }

    pub fn observe(&self) -> watch::Receiver<Vec<WeeklyAchievement>> {
        self.local.observe_achievements()
    }

    pub fn all(&self) -> Vec<WeeklyAchievement> {
        self.local.achievements()
    }

    pub async fn get(
        &self,
        week_start: DateTime<Utc>,
    ) -> Result<Option<WeeklyAchievement>, DatabaseError> {
        self.local.achievement(week_start).await
    }

    pub async fn save(&self, achievement: &WeeklyAchievement) -> Result<(), DatabaseError> {
        self.local.save_achievement(achievement).await?;
        let pushed = achievement.clone();
        self.sync.push(
            format!("achievement {}", achievement.week_start.timestamp_millis()),
            move |mirror| async move { mirror.save_achievement(&pushed).await },
        );
        Ok(())
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.sync.status().subscribe()
    }
}
