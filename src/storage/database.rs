//! Database operations using rusqlite.
//!
//! The `Database` owns a single SQLite connection. Callers that share it
//! across tasks go through [`crate::storage::LocalStore`].

use crate::calendar::{decode_date, encode_date, from_millis, to_millis, truncate_to_millis};
use crate::goals::types::{RaceGoal, WeeklyAchievement, WeeklyTarget};
use crate::profile::UserProfile;
use crate::runs::{NewRun, RunRecord};
use crate::storage::schema::{CURRENT_VERSION, MIGRATIONS, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.get_schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    fn get_schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Apply every migration newer than `from_version`, one version at a time.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        for (index, sql) in MIGRATIONS.iter().enumerate() {
            let version = index as i32 + 1;
            if version <= from_version {
                continue;
            }

            // A step and its version row commit together.
            let tx = self
                .conn
                .unchecked_transaction()
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tx.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                [version],
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tx.commit()
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", version);
        }

        Ok(())
    }

    // ========== Run Log Operations ==========

    /// Insert a new run and return it as stored, with its assigned id.
    pub fn insert_run(&self, run: &NewRun) -> Result<RunRecord, DatabaseError> {
        let date = truncate_to_millis(run.date);
        self.conn
            .execute(
                "INSERT INTO run_logs (date, duration_minutes, run_type, pace_seconds_per_km)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_millis(date),
                    run.duration_minutes,
                    run.run_type.as_str(),
                    run.pace_seconds_per_km,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let id = self.conn.last_insert_rowid();
        Ok(NewRun { date, ..run.clone() }.with_id(id))
    }

    /// Insert a run keeping its existing id, replacing any row with that id.
    pub fn restore_run(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO run_logs (id, date, duration_minutes, run_type, pace_seconds_per_km)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run.id,
                    to_millis(run.date),
                    run.duration_minutes,
                    run.run_type.as_str(),
                    run.pace_seconds_per_km,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Update an existing run.
    pub fn update_run(&self, run: &RunRecord) -> Result<(), DatabaseError> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE run_logs SET date = ?2, duration_minutes = ?3, run_type = ?4,
                 pace_seconds_per_km = ?5 WHERE id = ?1",
                params![
                    run.id,
                    to_millis(run.date),
                    run.duration_minutes,
                    run.run_type.as_str(),
                    run.pace_seconds_per_km,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        if rows_affected == 0 {
            return Err(DatabaseError::NotFound(format!("Run {}", run.id)));
        }

        Ok(())
    }

    /// Delete a run by id. Returns whether a row was removed.
    pub fn delete_run(&self, id: i64) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM run_logs WHERE id = ?1", params![id])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(rows_affected > 0)
    }

    /// Get a run by id.
    pub fn get_run(&self, id: i64) -> Result<Option<RunRecord>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, duration_minutes, run_type, pace_seconds_per_km
                 FROM run_logs WHERE id = ?1",
                params![id],
                RunRow::from_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(RunRow::into_run).transpose()
    }

    /// All runs, newest first.
    pub fn list_runs(&self) -> Result<Vec<RunRecord>, DatabaseError> {
        self.query_runs(
            "SELECT id, date, duration_minutes, run_type, pace_seconds_per_km
             FROM run_logs ORDER BY date DESC, id DESC",
            params![],
        )
    }

    /// Runs on or after `since`, newest first.
    pub fn list_runs_since(&self, since: DateTime<Utc>) -> Result<Vec<RunRecord>, DatabaseError> {
        self.query_runs(
            "SELECT id, date, duration_minutes, run_type, pace_seconds_per_km
             FROM run_logs WHERE date >= ?1 ORDER BY date DESC, id DESC",
            params![to_millis(since)],
        )
    }

    fn query_runs(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<RunRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params, RunRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut runs = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            runs.push(row.into_run()?);
        }

        Ok(runs)
    }

    /// Sum of run minutes in `[start, end)`.
    pub fn total_minutes_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        let total: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(duration_minutes), 0) FROM run_logs
                 WHERE date >= ?1 AND date < ?2",
                params![to_millis(start), to_millis(end)],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        u32::try_from(total).map_err(|_| {
            DatabaseError::DeserializationError(format!("minute total out of range: {}", total))
        })
    }

    /// Count runs in the database.
    pub fn count_runs(&self) -> Result<usize, DatabaseError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM run_logs", [], |row| row.get(0))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(count as usize)
    }

    // ========== Weekly Target Operations ==========

    /// Get the weekly target, if one is set.
    pub fn get_weekly_target(&self) -> Result<Option<WeeklyTarget>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT zone2_pace_seconds_per_km, tempo_pace_seconds_per_km,
                 weekly_duration_minutes, zone2_note, tempo_note
                 FROM weekly_targets WHERE id = 1",
                [],
                |row| {
                    Ok(WeeklyTarget {
                        zone2_pace_seconds_per_km: row.get(0)?,
                        tempo_pace_seconds_per_km: row.get(1)?,
                        weekly_duration_minutes: row.get(2)?,
                        zone2_note: row.get(3)?,
                        tempo_note: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Save the weekly target, replacing any previous one.
    pub fn save_weekly_target(&self, target: &WeeklyTarget) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO weekly_targets (id, zone2_pace_seconds_per_km,
                 tempo_pace_seconds_per_km, weekly_duration_minutes, zone2_note, tempo_note)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)",
                params![
                    target.zone2_pace_seconds_per_km,
                    target.tempo_pace_seconds_per_km,
                    target.weekly_duration_minutes,
                    target.zone2_note,
                    target.tempo_note,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Remove the weekly target. Returns whether one was set.
    pub fn delete_weekly_target(&self) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM weekly_targets WHERE id = 1", [])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(rows_affected > 0)
    }

    // ========== User Profile Operations ==========

    /// Get the user profile, if one is set.
    pub fn get_user_profile(&self) -> Result<Option<UserProfile>, DatabaseError> {
        let row: Option<(String, String, u32)> = self
            .conn
            .query_row(
                "SELECT name, gender, age FROM user_profile WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        match row {
            Some((name, gender, age)) => {
                let gender = gender
                    .parse()
                    .map_err(|e: crate::runs::UnknownVariant| {
                        DatabaseError::DeserializationError(e.to_string())
                    })?;
                Ok(Some(UserProfile { name, gender, age }))
            }
            None => Ok(None),
        }
    }

    /// Save the user profile, replacing any previous one.
    pub fn save_user_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO user_profile (id, name, gender, age) VALUES (1, ?1, ?2, ?3)",
                params![profile.name, profile.gender.as_str(), profile.age],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    // ========== Race Goal Operations ==========

    /// Get the race goal, if one is set.
    pub fn get_race_goal(&self) -> Result<Option<RaceGoal>, DatabaseError> {
        let row: Option<(String, String, Option<u32>)> = self
            .conn
            .query_row(
                "SELECT race_name, race_date, target_time_seconds FROM race_goals WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        match row {
            Some((race_name, race_date, target_time_seconds)) => {
                let race_date = decode_date(&race_date)
                    .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;
                Ok(Some(RaceGoal {
                    race_name,
                    race_date,
                    target_time_seconds,
                }))
            }
            None => Ok(None),
        }
    }

    /// Save the race goal, replacing any previous one.
    pub fn save_race_goal(&self, goal: &RaceGoal) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO race_goals (id, race_name, race_date, target_time_seconds)
                 VALUES (1, ?1, ?2, ?3)",
                params![goal.race_name, encode_date(goal.race_date), goal.target_time_seconds],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// Remove the race goal. Returns whether one was set.
    pub fn delete_race_goal(&self) -> Result<bool, DatabaseError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM race_goals WHERE id = 1", [])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(rows_affected > 0)
    }

    // ========== Weekly Achievement Operations ==========

    /// Get the settled record for the week starting at `week_start`.
    pub fn get_achievement(
        &self,
        week_start: DateTime<Utc>,
    ) -> Result<Option<WeeklyAchievement>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT week_start_timestamp, target_minutes, actual_minutes, goal_achieved, recorded_at
                 FROM weekly_achievements WHERE week_start_timestamp = ?1",
                params![to_millis(week_start)],
                AchievementRow::from_row,
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        row.map(AchievementRow::into_achievement).transpose()
    }

    /// Upsert a weekly achievement by week key.
    pub fn save_achievement(&self, achievement: &WeeklyAchievement) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO weekly_achievements
                 (week_start_timestamp, target_minutes, actual_minutes, goal_achieved, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    to_millis(achievement.week_start),
                    achievement.target_minutes,
                    achievement.actual_minutes,
                    achievement.goal_achieved,
                    to_millis(achievement.recorded_at),
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// All settled weeks, newest first.
    pub fn list_achievements(&self) -> Result<Vec<WeeklyAchievement>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT week_start_timestamp, target_minutes, actual_minutes, goal_achieved, recorded_at
                 FROM weekly_achievements ORDER BY week_start_timestamp DESC",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], AchievementRow::from_row)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut achievements = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            achievements.push(row.into_achievement()?);
        }

        Ok(achievements)
    }
}

/// Helper struct for reading run rows.
struct RunRow {
    id: i64,
    date: i64,
    duration_minutes: u32,
    run_type: String,
    pace_seconds_per_km: u32,
}

impl RunRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            duration_minutes: row.get(2)?,
            run_type: row.get(3)?,
            pace_seconds_per_km: row.get(4)?,
        })
    }

    fn into_run(self) -> Result<RunRecord, DatabaseError> {
        let date = from_millis(self.date).ok_or_else(|| {
            DatabaseError::DeserializationError(format!("invalid run date: {}", self.date))
        })?;
        let run_type = self
            .run_type
            .parse()
            .map_err(|e: crate::runs::UnknownVariant| DatabaseError::DeserializationError(e.to_string()))?;

        Ok(RunRecord {
            id: self.id,
            date,
            duration_minutes: self.duration_minutes,
            run_type,
            pace_seconds_per_km: self.pace_seconds_per_km,
        })
    }
}

/// Helper struct for reading weekly achievement rows.
struct AchievementRow {
    week_start: i64,
    target_minutes: u32,
    actual_minutes: u32,
    goal_achieved: bool,
    recorded_at: i64,
}

impl AchievementRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            week_start: row.get(0)?,
            target_minutes: row.get(1)?,
            actual_minutes: row.get(2)?,
            goal_achieved: row.get(3)?,
            recorded_at: row.get(4)?,
        })
    }

    fn into_achievement(self) -> Result<WeeklyAchievement, DatabaseError> {
        let week_start = from_millis(self.week_start).ok_or_else(|| {
            DatabaseError::DeserializationError(format!("invalid week start: {}", self.week_start))
        })?;
        let recorded_at = from_millis(self.recorded_at).ok_or_else(|| {
            DatabaseError::DeserializationError(format!("invalid recorded_at: {}", self.recorded_at))
        })?;

        Ok(WeeklyAchievement {
            week_start,
            target_minutes: self.target_minutes,
            actual_minutes: self.actual_minutes,
            goal_achieved: self.goal_achieved,
            recorded_at,
        })
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
