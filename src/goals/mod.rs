//! Weekly goals module.
//!
//! Covers the weekly target, the race goal, settled weeks and the
//! consecutive-week streak derived from them.

pub mod engine;
pub mod streak;
pub mod types;

// Re-exports for convenience
pub use engine::{AchievementEngine, SettleOutcome};
pub use streak::{compute_streak, compute_streak_in};
pub use types::{RaceGoal, WeeklyAchievement, WeeklyTarget};
