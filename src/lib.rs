//! Paceline - Run Training Tracker
//!
//! Logs runs against weekly pace and volume targets, settles each finished
//! week into a pass/fail record and derives a consecutive-week streak.
//! Local storage is authoritative; a per-user remote mirror is kept
//! best-effort for backup and restore across devices.

pub mod app;
pub mod calendar;
pub mod format;
pub mod goals;
pub mod identity;
pub mod profile;
pub mod runs;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use app::{CoreError, StartupReport, TrainingCore};
pub use goals::{AchievementEngine, RaceGoal, WeeklyAchievement, WeeklyTarget};
pub use profile::{Gender, UserProfile};
pub use runs::{NewRun, RunRecord, RunType};
pub use storage::config::AppConfig;
pub use sync::SyncStatus;
