//! Observable local store.
//!
//! Wraps [`Database`] and publishes the current value of every entity on a
//! `watch` channel. A write returns only after the affected channel holds
//! the new value, so a read or subscriber that runs after the call already
//! sees it.

use crate::goals::types::{RaceGoal, WeeklyAchievement, WeeklyTarget};
use crate::profile::UserProfile;
use crate::runs::{NewRun, RunRecord};
use crate::storage::database::{Database, DatabaseError};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::{watch, Mutex};

/// Local authoritative store.
pub struct LocalStore {
    db: Mutex<Database>,
    profile: watch::Sender<Option<UserProfile>>,
    target: watch::Sender<Option<WeeklyTarget>>,
    race_goal: watch::Sender<Option<RaceGoal>>,
    runs: watch::Sender<Vec<RunRecord>>,
    achievements: watch::Sender<Vec<WeeklyAchievement>>,
}

impl LocalStore {
    /// Open the store backed by the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::from_database(Database::open(path)?)
    }

    /// Store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_database(Database::open_in_memory()?)
    }

    /// Wrap an open database, seeding every channel from its contents.
    pub fn from_database(db: Database) -> Result<Self, DatabaseError> {
        let (profile, _) = watch::channel(db.get_user_profile()?);
        let (target, _) = watch::channel(db.get_weekly_target()?);
        let (race_goal, _) = watch::channel(db.get_race_goal()?);
        let (runs, _) = watch::channel(db.list_runs()?);
        let (achievements, _) = watch::channel(db.list_achievements()?);

        Ok(Self {
            db: Mutex::new(db),
            profile,
            target,
            race_goal,
            runs,
            achievements,
        })
    }

    // ========== Observables ==========

    pub fn observe_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile.subscribe()
    }

    pub fn observe_target(&self) -> watch::Receiver<Option<WeeklyTarget>> {
        self.target.subscribe()
    }

    pub fn observe_race_goal(&self) -> watch::Receiver<Option<RaceGoal>> {
        self.race_goal.subscribe()
    }

    /// Run list, newest first.
    pub fn observe_runs(&self) -> watch::Receiver<Vec<RunRecord>> {
        self.runs.subscribe()
    }

    /// Settled weeks, newest first.
    pub fn observe_achievements(&self) -> watch::Receiver<Vec<WeeklyAchievement>> {
        self.achievements.subscribe()
    }

    // ========== Reads ==========

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    pub fn target(&self) -> Option<WeeklyTarget> {
        self.target.borrow().clone()
    }

    pub fn race_goal(&self) -> Option<RaceGoal> {
        self.race_goal.borrow().clone()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.borrow().clone()
    }

    pub fn achievements(&self) -> Vec<WeeklyAchievement> {
        self.achievements.borrow().clone()
    }

    /// Runs on or after `since`, newest first.
    pub async fn runs_since(&self, since: DateTime<Utc>) -> Result<Vec<RunRecord>, DatabaseError> {
        self.db.lock().await.list_runs_since(since)
    }

    /// Sum of run minutes in `[start, end)`.
    pub async fn total_minutes_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        self.db.lock().await.total_minutes_between(start, end)
    }

    pub async fn achievement(
        &self,
        week_start: DateTime<Utc>,
    ) -> Result<Option<WeeklyAchievement>, DatabaseError> {
        self.db.lock().await.get_achievement(week_start)
    }

    /// True when there are no runs and no profile, target or race goal.
    ///
    /// Settled weeks alone do not make the store non-empty.
    pub fn is_empty(&self) -> bool {
        self.runs.borrow().is_empty()
            && self.profile.borrow().is_none()
            && self.target.borrow().is_none()
            && self.race_goal.borrow().is_none()
    }

    // ========== Writes ==========

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.save_user_profile(profile)?;
        self.profile.send_replace(db.get_user_profile()?);
        Ok(())
    }

    pub async fn save_target(&self, target: &WeeklyTarget) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.save_weekly_target(target)?;
        self.target.send_replace(db.get_weekly_target()?);
        Ok(())
    }

    /// Remove the weekly target. Returns whether one was set.
    pub async fn clear_target(&self) -> Result<bool, DatabaseError> {
        let db = self.db.lock().await;
        let removed = db.delete_weekly_target()?;
        self.target.send_replace(None);
        Ok(removed)
    }

    pub async fn save_race_goal(&self, goal: &RaceGoal) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.save_race_goal(goal)?;
        self.race_goal.send_replace(db.get_race_goal()?);
        Ok(())
    }

    /// Remove the race goal. Returns whether one was set.
    pub async fn clear_race_goal(&self) -> Result<bool, DatabaseError> {
        let db = self.db.lock().await;
        let removed = db.delete_race_goal()?;
        self.race_goal.send_replace(None);
        Ok(removed)
    }

    /// Insert a new run and return it with its assigned id.
    pub async fn insert_run(&self, run: &NewRun) -> Result<RunRecord, DatabaseError> {
        let db = self.db.lock().await;
        let stored = db.insert_run(run)?;
        self.runs.send_replace(db.list_runs()?);
        Ok(stored)
    }

    /// Insert a run under its existing id.
    pub async fn restore_run(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.restore_run(run)?;
        self.runs.send_replace(db.list_runs()?);
        Ok(())
    }

    pub async fn update_run(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.update_run(run)?;
        self.runs.send_replace(db.list_runs()?);
        Ok(())
    }

    /// Delete a run. Returns whether it existed.
    pub async fn delete_run(&self, id: i64) -> Result<bool, DatabaseError> {
        let db = self.db.lock().await;
        let removed = db.delete_run(id)?;
        if removed {
            self.runs.send_replace(db.list_runs()?);
        }
        Ok(removed)
    }

    /// Upsert a settled week by its week key.
    pub async fn save_achievement(&self, achievement: &WeeklyAchievement) -> Result<(), DatabaseError> {
        let db = self.db.lock().await;
        db.save_achievement(achievement)?;
        self.achievements.send_replace(db.list_achievements()?);
        Ok(())
    }
}
