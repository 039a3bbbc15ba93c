//! Weekly target, race goal and weekly achievement types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pace and volume targets for every week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTarget {
    /// Target easy aerobic pace, e.g. 390 = 6:30 /km
    pub zone2_pace_seconds_per_km: u32,
    /// Target tempo pace, e.g. 300 = 5:00 /km
    pub tempo_pace_seconds_per_km: u32,
    /// Total running minutes to reach each week
    pub weekly_duration_minutes: u32,
    /// Free-form note for easy runs
    #[serde(default)]
    pub zone2_note: String,
    /// Free-form note for tempo runs
    #[serde(default)]
    pub tempo_note: String,
}

impl WeeklyTarget {
    /// Create a target without notes.
    pub fn new(zone2_pace: u32, tempo_pace: u32, weekly_duration_minutes: u32) -> Self {
        Self {
            zone2_pace_seconds_per_km: zone2_pace,
            tempo_pace_seconds_per_km: tempo_pace,
            weekly_duration_minutes,
            zone2_note: String::new(),
            tempo_note: String::new(),
        }
    }

    /// Whether `minutes` of running meets the weekly duration target.
    pub fn is_met_by(&self, minutes: u32) -> bool {
        minutes >= self.weekly_duration_minutes
    }
}

/// The race being trained for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceGoal {
    pub race_name: String,
    /// Race day (calendar date, no time component)
    pub race_date: NaiveDate,
    /// Optional finish time target, e.g. 6300 = 1:45:00
    pub target_time_seconds: Option<u32>,
}

impl RaceGoal {
    /// Create a race goal.
    pub fn new(race_name: impl Into<String>, race_date: NaiveDate, target_time_seconds: Option<u32>) -> Self {
        Self {
            race_name: race_name.into(),
            race_date,
            target_time_seconds,
        }
    }

    /// Days from `today` until race day (negative once the race is past).
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.race_date - today).num_days()
    }

    /// Check if race day has passed.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.race_date < today
    }
}

/// Outcome of one completed week. Written once per week and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAchievement {
    /// Week key: Monday 00:00:00.000 local time
    pub week_start: DateTime<Utc>,
    /// Weekly duration target in force when the week was settled
    pub target_minutes: u32,
    /// Minutes actually run that week
    pub actual_minutes: u32,
    /// `actual_minutes >= target_minutes`, frozen at settlement
    pub goal_achieved: bool,
    /// When the row was written
    pub recorded_at: DateTime<Utc>,
}

impl WeeklyAchievement {
    /// Build the settled record for a week.
    pub fn settle(
        week_start: DateTime<Utc>,
        target_minutes: u32,
        actual_minutes: u32,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            week_start,
            target_minutes,
            actual_minutes,
            goal_achieved: actual_minutes >= target_minutes,
            recorded_at,
        }
    }

    /// A week with nothing logged. Inactivity never breaks a streak.
    pub fn is_inactive(&self) -> bool {
        self.actual_minutes == 0
    }
}
