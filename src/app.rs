//! Training core: wires storage, sync and the achievement engine together.
//!
//! This is the surface a front end talks to. It exposes read-only
//! observables, a small set of commands, one merged sync status and the
//! current streak.

use crate::calendar::{shift_weeks, Clock, SystemClock};
use crate::goals::{AchievementEngine, RaceGoal, SettleOutcome, WeeklyTarget};
use crate::identity::{Anonymous, IdentityProvider, LocalIdentity};
use crate::profile::UserProfile;
use crate::runs::{NewRun, RunRecord};
use crate::storage::{AppConfig, DatabaseError, FlagError, FlagStore, LocalStore};
use crate::sync::{
    AchievementRepository, DocumentStore, HttpDocumentStore, MemoryDocumentStore, ProfileRepository,
    RaceGoalRepository, ReconcileReport, ReconciliationManager, RemoteError, RemoteMirror,
    RunRepository, SyncStatus, TargetRepository, TaskGroup,
};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What happened during [`TrainingCore::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub user_id: Option<String>,
    pub reconcile: ReconcileReport,
    pub settlement: SettleOutcome,
}

/// Application core.
pub struct TrainingCore {
    identity: Arc<dyn IdentityProvider>,
    reconciler: ReconciliationManager,
    tasks: TaskGroup,
    runs: RunRepository,
    targets: TargetRepository,
    profiles: ProfileRepository,
    race_goals: RaceGoalRepository,
    engine: Arc<AchievementEngine>,
    clock: Arc<dyn Clock>,
    started: AtomicBool,
    observers: Mutex<Vec<JoinHandle<()>>>,
}

impl TrainingCore {
    /// Build the core from configuration.
    ///
    /// With sync disabled the user is anonymous and nothing leaves the
    /// device. With sync enabled but no remote URL, documents are kept in
    /// memory for the life of the process.
    pub fn open(config: &AppConfig) -> Result<Self, CoreError> {
        let local = Arc::new(LocalStore::open(&config.database_path())?);
        let flags = Arc::new(FlagStore::open(&config.flags_path())?);

        let identity: Arc<dyn IdentityProvider> = if config.sync.enabled {
            Arc::new(LocalIdentity::new(
                flags.clone(),
                config.identity.user_id.clone(),
            ))
        } else {
            Arc::new(Anonymous)
        };

        let store: Arc<dyn DocumentStore> = match (config.sync.enabled, &config.sync.remote_url) {
            (true, Some(url)) => {
                tracing::info!("Mirroring to {}", url);
                Arc::new(HttpDocumentStore::new(url)?)
            }
            (true, None) => {
                tracing::warn!("Sync enabled without remote_url, using in-memory mirror");
                Arc::new(MemoryDocumentStore::new())
            }
            (false, _) => Arc::new(MemoryDocumentStore::new()),
        };

        Ok(Self::with_components(
            local,
            flags,
            store,
            identity,
            Arc::new(SystemClock),
        ))
    }

    /// Build the core from explicit components.
    pub fn with_components(
        local: Arc<LocalStore>,
        flags: Arc<FlagStore>,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mirror = RemoteMirror::new(store, identity.clone());
        let tasks = TaskGroup::new();

        let achievements = Arc::new(AchievementRepository::new(
            local.clone(),
            mirror.clone(),
            tasks.clone(),
        ));
        let engine = Arc::new(AchievementEngine::new(
            local.clone(),
            achievements,
            clock.clone(),
        ));

        Self {
            runs: RunRepository::new(local.clone(), mirror.clone(), tasks.clone()),
            targets: TargetRepository::new(local.clone(), mirror.clone(), tasks.clone()),
            profiles: ProfileRepository::new(local.clone(), mirror.clone(), tasks.clone()),
            race_goals: RaceGoalRepository::new(local.clone(), mirror.clone(), tasks.clone()),
            reconciler: ReconciliationManager::new(local, mirror, flags),
            identity,
            tasks,
            engine,
            clock,
            started: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Start-up sequence: identity, reconciliation, settlement, observers.
    ///
    /// Remote failures are logged and never fail start-up. Local storage
    /// errors are returned.
    pub async fn start(&self) -> Result<StartupReport, DatabaseError> {
        let user_id = match self.identity.ensure_authenticated().await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::info!("Continuing without remote sync: {}", e);
                None
            }
        };

        let reconcile = self.reconciler.run().await;
        let settlement = self.engine.settle_previous_week().await?;

        if !self.started.swap(true, Ordering::SeqCst) {
            self.spawn_observers();
        }

        Ok(StartupReport {
            user_id,
            reconcile,
            settlement,
        })
    }

    fn spawn_observers(&self) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.push(self.engine.start_observing());
    }

    /// Wait until every background push has finished.
    ///
    /// On return the merged status already holds the last outcome.
    pub async fn wait_for_pending_sync(&self) {
        self.tasks.wait_idle().await;
    }

    pub fn user_id(&self) -> Option<String> {
        self.identity.user_id()
    }

    // ========== Observables ==========

    pub fn observe_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profiles.observe()
    }

    pub fn observe_target(&self) -> watch::Receiver<Option<WeeklyTarget>> {
        self.targets.observe()
    }

    pub fn observe_race_goal(&self) -> watch::Receiver<Option<RaceGoal>> {
        self.race_goals.observe()
    }

    pub fn observe_runs(&self) -> watch::Receiver<Vec<RunRecord>> {
        self.runs.observe()
    }

    /// Latest push transition of any repository.
    pub fn observe_sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.tasks.status().subscribe()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.tasks.status().current()
    }

    /// Streak count, live once [`TrainingCore::start`] has run.
    pub fn observe_streak(&self) -> watch::Receiver<u32> {
        self.engine.observe_streak()
    }

    pub fn current_streak(&self) -> u32 {
        self.engine.current_streak()
    }

    // ========== Reads ==========

    pub fn profile(&self) -> Option<UserProfile> {
        self.profiles.current()
    }

    pub fn target(&self) -> Option<WeeklyTarget> {
        self.targets.current()
    }

    pub fn race_goal(&self) -> Option<RaceGoal> {
        self.race_goals.current()
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.all()
    }

    /// Runs logged since the start of the current week, newest first.
    pub async fn runs_this_week(&self) -> Result<Vec<RunRecord>, DatabaseError> {
        self.runs.since(self.engine.current_week_start()).await
    }

    /// Minutes logged in the current week.
    pub async fn current_week_minutes(&self) -> Result<u32, DatabaseError> {
        let start = self.engine.current_week_start();
        self.runs
            .total_minutes_between(start, shift_weeks(start, 1))
            .await
    }

    /// Days until race day, counted on the local calendar.
    pub fn days_until_race(&self) -> Option<i64> {
        let today = self.clock.now().with_timezone(&Local).date_naive();
        self.race_goals.current().map(|goal| goal.days_until(today))
    }

    // ========== Commands ==========

    pub async fn log_run(&self, run: &NewRun) -> Result<RunRecord, DatabaseError> {
        self.runs.insert(run).await
    }

    pub async fn update_run(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        self.runs.update(run).await
    }

    pub async fn delete_run(&self, id: i64) -> Result<bool, DatabaseError> {
        self.runs.delete(id).await
    }

    pub async fn save_target(&self, target: &WeeklyTarget) -> Result<(), DatabaseError> {
        self.targets.save(target).await
    }

    pub async fn clear_target(&self) -> Result<bool, DatabaseError> {
        self.targets.clear().await
    }

    pub async fn save_race_goal(&self, goal: &RaceGoal) -> Result<(), DatabaseError> {
        self.race_goals.save(goal).await
    }

    pub async fn clear_race_goal(&self) -> Result<bool, DatabaseError> {
        self.race_goals.clear().await
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.profiles.save(profile).await
    }

}

impl Drop for TrainingCore {
    fn drop(&mut self) {
        let observers = self.observers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in observers.drain(..) {
            handle.abort();
        }
    }
}

/// Errors building the core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Flag store error: {0}")]
    Flags(#[from] FlagError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}
