//! Weekly settlement and the live streak.

use super::streak::compute_streak;
use super::types::{WeeklyAchievement, WeeklyTarget};
use crate::calendar::{shift_weeks, week_start, Clock};
use crate::runs::RunRecord;
use crate::storage::{DatabaseError, LocalStore};
use crate::sync::AchievementRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What settling the previous week did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// A row for the week already exists.
    AlreadySettled,
    /// No weekly target to measure against.
    NoTarget,
    /// Zero target and zero minutes; nothing worth recording.
    NothingToRecord,
    Recorded(WeeklyAchievement),
}

/// Derives settled weeks and the streak from local data.
pub struct AchievementEngine {
    local: Arc<LocalStore>,
    achievements: Arc<AchievementRepository>,
    clock: Arc<dyn Clock>,
    streak: watch::Sender<u32>,
}

impl AchievementEngine {
    pub fn new(
        local: Arc<LocalStore>,
        achievements: Arc<AchievementRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (streak, _) = watch::channel(0);
        Self {
            local,
            achievements,
            clock,
            streak,
        }
    }

    /// Start of the running week.
    pub fn current_week_start(&self) -> DateTime<Utc> {
        week_start(self.clock.now())
    }

    /// Record the outcome of the week before the current one, once.
    pub async fn settle_previous_week(&self) -> Result<SettleOutcome, DatabaseError> {
        let current = self.current_week_start();
        let previous = shift_weeks(current, -1);

        if self.achievements.get(previous).await?.is_some() {
            tracing::debug!("Week {} already settled", previous);
            return Ok(SettleOutcome::AlreadySettled);
        }

        let Some(target) = self.local.target() else {
            tracing::debug!("No weekly target, skipping settlement of {}", previous);
            return Ok(SettleOutcome::NoTarget);
        };

        let actual = self.local.total_minutes_between(previous, current).await?;
        if actual == 0 && target.weekly_duration_minutes == 0 {
            return Ok(SettleOutcome::NothingToRecord);
        }

        let achievement = WeeklyAchievement::settle(
            previous,
            target.weekly_duration_minutes,
            actual,
            self.clock.now(),
        );
        self.achievements.save(&achievement).await?;

        tracing::info!(
            "Settled week {}: {}/{} minutes, achieved = {}",
            previous,
            actual,
            achievement.target_minutes,
            achievement.goal_achieved
        );

        Ok(SettleOutcome::Recorded(achievement))
    }

    /// Minutes logged so far in the running week.
    pub fn current_week_minutes(&self) -> u32 {
        let start = self.current_week_start();
        minutes_between(&self.local.runs(), start, shift_weeks(start, 1))
    }

    /// Whether the running week already meets the target. False without a target.
    pub fn is_current_week_on_pace(&self) -> bool {
        on_pace(self.local.target().as_ref(), self.current_week_minutes())
    }

    /// Streak from the current local state.
    pub fn current_streak(&self) -> u32 {
        let start = self.current_week_start();
        let runs = self.local.runs();
        let target = self.local.target();
        let minutes = minutes_between(&runs, start, shift_weeks(start, 1));

        compute_streak(
            &self.achievements.all(),
            start,
            on_pace(target.as_ref(), minutes),
        )
    }

    /// Latest streak, re-emitted on every change once observing has started.
    pub fn observe_streak(&self) -> watch::Receiver<u32> {
        self.streak.subscribe()
    }

    fn publish(&self) {
        let streak = self.current_streak();
        tracing::trace!("Streak recomputed: {}", streak);
        self.streak.send_replace(streak);
    }

    /// Recompute the streak whenever runs, settled weeks or the target change.
    ///
    /// The week is taken from the clock on each recomputation. A week that
    /// ends while observing is settled by the next start.
    pub fn start_observing(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut runs = engine.local.observe_runs();
        let mut target = engine.local.observe_target();
        let mut achievements = engine.achievements.observe();

        tokio::spawn(async move {
            engine.publish();
            loop {
                let changed = tokio::select! {
                    r = runs.changed() => r,
                    r = target.changed() => r,
                    r = achievements.changed() => r,
                };
                if changed.is_err() {
                    tracing::debug!("Local store closed, stopping streak observer");
                    break;
                }
                engine.publish();
            }
        })
    }
}

fn minutes_between(runs: &[RunRecord], start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    runs.iter()
        .filter(|run| run.is_within(start, end))
        .map(|run| run.duration_minutes)
        .sum()
}

fn on_pace(target: Option<&WeeklyTarget>, minutes: u32) -> bool {
    target.is_some_and(|t| t.is_met_by(minutes))
}
