//! Start-up reconciliation between the local store and the remote mirror.
//!
//! Runs once per process start, before anything else reads local data:
//! 1. restore from the mirror when the local store is empty;
//! 2. upload everything local once per user.
//!
//! Each phase records a per-user flag on completion. A failing phase is
//! logged and leaves its flag unset so the next start tries again.

use super::error::RemoteError;
use super::mirror::RemoteMirror;
use crate::storage::{flag_key, DatabaseError, FlagError, FlagStore, LocalStore};
use std::sync::Arc;
use thiserror::Error;

pub const RESTORE_COMPLETED_FLAG: &str = "restore_completed_for_user";
pub const MIGRATION_COMPLETED_FLAG: &str = "migration_completed_for_user";

/// Result of one reconciliation phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    /// Precondition not met; nothing was done.
    Skipped(&'static str),
    Failed(String),
}

/// What reconciliation did on this start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub restore: PhaseOutcome,
    pub migration: PhaseOutcome,
}

pub struct ReconciliationManager {
    local: Arc<LocalStore>,
    mirror: RemoteMirror,
    flags: Arc<FlagStore>,
}

impl ReconciliationManager {
    pub fn new(local: Arc<LocalStore>, mirror: RemoteMirror, flags: Arc<FlagStore>) -> Self {
        Self { local, mirror, flags }
    }

    fn key(&self, name: &str) -> String {
        flag_key(name, self.mirror.user_id().as_deref())
    }

    pub fn is_restore_completed(&self) -> bool {
        self.flags.get_bool(&self.key(RESTORE_COMPLETED_FLAG))
    }

    pub fn is_migration_completed(&self) -> bool {
        self.flags.get_bool(&self.key(MIGRATION_COMPLETED_FLAG))
    }

    /// Restore then migrate, strictly in that order. Never fails.
    pub async fn run(&self) -> ReconcileReport {
        let restore = match self.restore_if_local_empty().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Restore from remote failed: {}", e);
                PhaseOutcome::Failed(e.to_string())
            }
        };

        let migration = match self.perform_migration_if_needed().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Migration to remote failed: {}", e);
                PhaseOutcome::Failed(e.to_string())
            }
        };

        ReconcileReport { restore, migration }
    }

    /// Pull every entity from the mirror when the local store holds no data.
    ///
    /// Local data always wins: a non-empty store is never overwritten, even
    /// if no restore was ever recorded for this user.
    pub async fn restore_if_local_empty(&self) -> Result<PhaseOutcome, ReconcileError> {
        if !self.mirror.is_authenticated() {
            return Ok(PhaseOutcome::Skipped("not authenticated"));
        }
        if !self.local.is_empty() {
            tracing::debug!("Local data present, skipping restore");
            return Ok(PhaseOutcome::Skipped("local data present"));
        }

        tracing::info!("Local store is empty, restoring from remote");

        if let Some(profile) = self.mirror.fetch_profile().await? {
            self.local.save_profile(&profile).await?;
            tracing::debug!("Restored profile for {}", profile.name);
        }

        if let Some(target) = self.mirror.fetch_target().await? {
            self.local.save_target(&target).await?;
            tracing::debug!("Restored weekly target");
        }

        let runs = self.mirror.fetch_runs().await?;
        for run in &runs {
            self.local.restore_run(run).await?;
        }
        tracing::debug!("Restored {} runs", runs.len());

        let achievements = self.mirror.fetch_achievements().await?;
        for achievement in &achievements {
            self.local.save_achievement(achievement).await?;
        }
        tracing::debug!("Restored {} achievements", achievements.len());

        if let Some(goal) = self.mirror.fetch_race_goal().await? {
            self.local.save_race_goal(&goal).await?;
            tracing::debug!("Restored race goal {}", goal.race_name);
        }

        self.flags.set_bool(&self.key(RESTORE_COMPLETED_FLAG), true)?;
        tracing::info!("Restore from remote completed");

        Ok(PhaseOutcome::Completed)
    }

    /// Upload every local entity once per user.
    pub async fn perform_migration_if_needed(&self) -> Result<PhaseOutcome, ReconcileError> {
        if self.is_migration_completed() {
            return Ok(PhaseOutcome::Skipped("already migrated"));
        }
        if !self.mirror.is_authenticated() {
            return Ok(PhaseOutcome::Skipped("not authenticated"));
        }

        tracing::info!("Uploading local data to remote");

        if let Some(profile) = self.local.profile() {
            self.mirror.save_profile(&profile).await?;
        }

        if let Some(target) = self.local.target() {
            self.mirror.save_target(&target).await?;
        }

        for run in self.local.runs() {
            self.mirror.save_run(&run).await?;
        }

        for achievement in self.local.achievements() {
            self.mirror.save_achievement(&achievement).await?;
        }

        if let Some(goal) = self.local.race_goal() {
            self.mirror.save_race_goal(&goal).await?;
        }

        self.flags.set_bool(&self.key(MIGRATION_COMPLETED_FLAG), true)?;
        tracing::info!("Migration to remote completed");

        Ok(PhaseOutcome::Completed)
    }
}

/// Failure inside a reconciliation phase.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local storage error: {0}")]
    Local(#[from] DatabaseError),

    #[error("Flag store error: {0}")]
    Flag(#[from] FlagError),
}
