//! Database schema definitions for Paceline.
//!
//! Instants are stored as milliseconds since the Unix epoch, calendar dates
//! as `YYYY-MM-DD` text. Singleton tables pin their only row to `id = 1`.

/// Initial schema.
pub const SCHEMA_V1: &str = r#"
-- Run log table
CREATE TABLE IF NOT EXISTS run_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date INTEGER NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
    run_type TEXT NOT NULL,
    pace_seconds_per_km INTEGER NOT NULL CHECK (pace_seconds_per_km > 0)
);

CREATE INDEX IF NOT EXISTS idx_run_logs_date ON run_logs(date);

-- Weekly target (singleton)
CREATE TABLE IF NOT EXISTS weekly_targets (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    zone2_pace_seconds_per_km INTEGER NOT NULL,
    tempo_pace_seconds_per_km INTEGER NOT NULL,
    weekly_duration_minutes INTEGER NOT NULL
);

-- User profile (singleton)
CREATE TABLE IF NOT EXISTS user_profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT NOT NULL,
    gender TEXT NOT NULL,
    age INTEGER NOT NULL
);

-- Settled weeks, keyed by week start
CREATE TABLE IF NOT EXISTS weekly_achievements (
    week_start_timestamp INTEGER PRIMARY KEY,
    target_minutes INTEGER NOT NULL,
    actual_minutes INTEGER NOT NULL,
    goal_achieved INTEGER NOT NULL,
    recorded_at INTEGER NOT NULL
);

-- Race goal (singleton)
CREATE TABLE IF NOT EXISTS race_goals (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    race_name TEXT NOT NULL,
    race_date TEXT NOT NULL,
    target_time_seconds INTEGER
);
"#;

/// Adds per-run-type notes to the weekly target. Existing rows get empty notes.
pub const MIGRATION_V2: &str = r#"
ALTER TABLE weekly_targets ADD COLUMN zone2_note TEXT NOT NULL DEFAULT '';
ALTER TABLE weekly_targets ADD COLUMN tempo_note TEXT NOT NULL DEFAULT '';
"#;

/// Ordered migrations; entry `n` brings the schema to version `n + 1`.
pub const MIGRATIONS: &[&str] = &[SCHEMA_V1, MIGRATION_V2];

/// Current schema version.
pub const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

/// Schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;
