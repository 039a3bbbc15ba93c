//! Consecutive-week streak derivation.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::HashMap;

use super::types::WeeklyAchievement;
use crate::calendar::shift_weeks_in;

/// Streak for the week starting at `current_week_start`, in the local time zone.
///
/// `current_week_on_pace` is the live projection for the running week.
pub fn compute_streak(
    achievements: &[WeeklyAchievement],
    current_week_start: DateTime<Utc>,
    current_week_on_pace: bool,
) -> u32 {
    compute_streak_in(achievements, current_week_start, current_week_on_pace, &Local)
}

/// Streak computation with an explicit time zone for week stepping.
///
/// Walks backward from the previous week while each week has a row with
/// `goal_achieved`. The live week then adds one more unless the previous
/// week was an active miss: a missing row or a zero-minute row does not
/// count as a break.
pub fn compute_streak_in<Tz: TimeZone>(
    achievements: &[WeeklyAchievement],
    current_week_start: DateTime<Utc>,
    current_week_on_pace: bool,
    tz: &Tz,
) -> u32 {
    let by_week: HashMap<DateTime<Utc>, &WeeklyAchievement> = achievements
        .iter()
        .filter(|a| a.week_start < current_week_start)
        .map(|a| (a.week_start, a))
        .collect();

    let previous_week_start = shift_weeks_in(current_week_start, -1, tz);

    let mut past_streak = 0;
    let mut expected = previous_week_start;
    while let Some(row) = by_week.get(&expected) {
        if !row.goal_achieved {
            break;
        }
        past_streak += 1;
        expected = shift_weeks_in(expected, -1, tz);
    }

    if !current_week_on_pace {
        return past_streak;
    }

    let previous_week_broken = by_week
        .get(&previous_week_start)
        .is_some_and(|row| !row.goal_achieved && !row.is_inactive());

    if previous_week_broken {
        past_streak
    } else {
        past_streak + 1
    }
}
