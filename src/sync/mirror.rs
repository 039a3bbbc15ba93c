//! Typed view of the remote per-user documents.
//!
//! Every entity maps to a camelCase JSON document that also carries an
//! `updatedAt` timestamp. The timestamp is bookkeeping for the mirror and is
//! dropped when a document is turned back into an entity.

use super::document::{Collection, DocumentPath, DocumentStore, CURRENT_DOC};
use super::error::RemoteError;
use crate::calendar::{decode_date, encode_date, from_millis, shift_weeks, to_millis, week_start};
use crate::goals::types::{RaceGoal, WeeklyAchievement, WeeklyTarget};
use crate::identity::IdentityProvider;
use crate::profile::{Gender, UserProfile};
use crate::runs::{RunRecord, RunType};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDocument {
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTargetDocument {
    pub zone2_pace_seconds_per_km: u32,
    pub tempo_pace_seconds_per_km: u32,
    pub weekly_duration_minutes: u32,
    #[serde(default)]
    pub zone2_note: String,
    #[serde(default)]
    pub tempo_note: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogDocument {
    pub local_id: i64,
    /// Milliseconds since the Unix epoch
    pub date: i64,
    pub duration_minutes: u32,
    pub run_type: RunType,
    pub pace_seconds_per_km: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAchievementDocument {
    pub week_start_timestamp: i64,
    pub target_minutes: u32,
    pub actual_minutes: u32,
    pub goal_achieved: bool,
    pub recorded_at: i64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceGoalDocument {
    pub race_name: String,
    /// ISO calendar date, `YYYY-MM-DD`
    pub race_date: String,
    #[serde(default)]
    pub target_time_seconds: Option<u32>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Remote copy of the local entities, scoped to the current user.
#[derive(Clone)]
pub struct RemoteMirror {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl RemoteMirror {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }

    pub fn user_id(&self) -> Option<String> {
        self.identity.user_id()
    }

    fn require_user(&self) -> Result<String, RemoteError> {
        self.identity.user_id().ok_or(RemoteError::NotAuthenticated)
    }

    async fn put<T: Serialize>(&self, collection: Collection, doc_id: &str, doc: &T) -> Result<(), RemoteError> {
        let path = DocumentPath::new(self.require_user()?, collection, doc_id);
        self.store.put(&path, serde_json::to_value(doc)?).await
    }

    async fn delete(&self, collection: Collection, doc_id: &str) -> Result<(), RemoteError> {
        let path = DocumentPath::new(self.require_user()?, collection, doc_id);
        self.store.delete(&path).await
    }

    async fn fetch_current<T: DeserializeOwned>(&self, collection: Collection) -> Result<Option<T>, RemoteError> {
        let path = DocumentPath::current(self.require_user()?, collection);
        match self.store.get(&path).await? {
            Some(value) => decode(&path, value).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_all<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<(DocumentPath, T)>, RemoteError> {
        let user_id = self.require_user()?;
        let mut documents = Vec::new();
        for (doc_id, value) in self.store.list(&user_id, collection).await? {
            let path = DocumentPath::new(user_id.clone(), collection, doc_id);
            let doc = decode(&path, value)?;
            documents.push((path, doc));
        }
        Ok(documents)
    }

    // ========== Profile ==========

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), RemoteError> {
        let doc = UserProfileDocument {
            name: profile.name.clone(),
            gender: profile.gender,
            age: profile.age,
            updated_at: Utc::now(),
        };
        self.put(Collection::Profile, CURRENT_DOC, &doc).await
    }

    pub async fn fetch_profile(&self) -> Result<Option<UserProfile>, RemoteError> {
        let doc: Option<UserProfileDocument> = self.fetch_current(Collection::Profile).await?;
        Ok(doc.map(|doc| UserProfile::new(doc.name, doc.gender, doc.age)))
    }

    // ========== Weekly target ==========

    pub async fn save_target(&self, target: &WeeklyTarget) -> Result<(), RemoteError> {
        let doc = WeeklyTargetDocument {
            zone2_pace_seconds_per_km: target.zone2_pace_seconds_per_km,
            tempo_pace_seconds_per_km: target.tempo_pace_seconds_per_km,
            weekly_duration_minutes: target.weekly_duration_minutes,
            zone2_note: target.zone2_note.clone(),
            tempo_note: target.tempo_note.clone(),
            updated_at: Utc::now(),
        };
        self.put(Collection::Targets, CURRENT_DOC, &doc).await
    }

    pub async fn delete_target(&self) -> Result<(), RemoteError> {
        self.delete(Collection::Targets, CURRENT_DOC).await
    }

    pub async fn fetch_target(&self) -> Result<Option<WeeklyTarget>, RemoteError> {
        let doc: Option<WeeklyTargetDocument> = self.fetch_current(Collection::Targets).await?;
        Ok(doc.map(|doc| WeeklyTarget {
            zone2_pace_seconds_per_km: doc.zone2_pace_seconds_per_km,
            tempo_pace_seconds_per_km: doc.tempo_pace_seconds_per_km,
            weekly_duration_minutes: doc.weekly_duration_minutes,
            zone2_note: doc.zone2_note,
            tempo_note: doc.tempo_note,
        }))
    }

    // ========== Runs ==========

    pub async fn save_run(&self, run: &RunRecord) -> Result<(), RemoteError> {
        let doc = RunLogDocument {
            local_id: run.id,
            date: to_millis(run.date),
            duration_minutes: run.duration_minutes,
            run_type: run.run_type,
            pace_seconds_per_km: run.pace_seconds_per_km,
            updated_at: Utc::now(),
        };
        self.put(Collection::RunLogs, &run.id.to_string(), &doc).await
    }

    pub async fn delete_run(&self, id: i64) -> Result<(), RemoteError> {
        self.delete(Collection::RunLogs, &id.to_string()).await
    }

    pub async fn fetch_runs(&self) -> Result<Vec<RunRecord>, RemoteError> {
        let docs: Vec<(DocumentPath, RunLogDocument)> = self.fetch_all(Collection::RunLogs).await?;
        docs.into_iter()
            .map(|(path, doc)| {
                let date = from_millis(doc.date).ok_or_else(|| RemoteError::Decode {
                    path: path.to_string(),
                    reason: format!("invalid date {}", doc.date),
                })?;
                Ok(RunRecord {
                    id: doc.local_id,
                    date,
                    duration_minutes: doc.duration_minutes,
                    run_type: doc.run_type,
                    pace_seconds_per_km: doc.pace_seconds_per_km,
                })
            })
            .collect()
    }

    // ========== Achievements ==========

    pub async fn save_achievement(&self, achievement: &WeeklyAchievement) -> Result<(), RemoteError> {
        let key = to_millis(achievement.week_start);
        let doc = WeeklyAchievementDocument {
            week_start_timestamp: key,
            target_minutes: achievement.target_minutes,
            actual_minutes: achievement.actual_minutes,
            goal_achieved: achievement.goal_achieved,
            recorded_at: to_millis(achievement.recorded_at),
            updated_at: Utc::now(),
        };
        self.put(Collection::Achievements, &key.to_string(), &doc).await
    }

    /// Settled weeks from the remote copy.
    ///
    /// Week starts written in another time zone are moved to the nearest
    /// local week start. Documents that are not near any week start are
    /// skipped.
    pub async fn fetch_achievements(&self) -> Result<Vec<WeeklyAchievement>, RemoteError> {
        let docs: Vec<(DocumentPath, WeeklyAchievementDocument)> =
            self.fetch_all(Collection::Achievements).await?;

        let mut achievements = Vec::with_capacity(docs.len());
        let mut skipped = 0;
        for (path, doc) in docs {
            let (Some(start), Some(recorded_at)) =
                (from_millis(doc.week_start_timestamp), from_millis(doc.recorded_at))
            else {
                return Err(RemoteError::Decode {
                    path: path.to_string(),
                    reason: "invalid timestamp".to_string(),
                });
            };

            let Some(aligned) = align_week_start(start) else {
                tracing::debug!("Achievement {} is not keyed by a week start", path);
                skipped += 1;
                continue;
            };

            achievements.push(WeeklyAchievement {
                week_start: aligned,
                target_minutes: doc.target_minutes,
                actual_minutes: doc.actual_minutes,
                goal_achieved: doc.goal_achieved,
                recorded_at,
            });
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} remote achievements not keyed by a week start", skipped);
        }
        Ok(achievements)
    }

    // ========== Race goal ==========

    pub async fn save_race_goal(&self, goal: &RaceGoal) -> Result<(), RemoteError> {
        let doc = RaceGoalDocument {
            race_name: goal.race_name.clone(),
            race_date: encode_date(goal.race_date),
            target_time_seconds: goal.target_time_seconds,
            updated_at: Utc::now(),
        };
        self.put(Collection::RaceGoal, CURRENT_DOC, &doc).await
    }

    pub async fn delete_race_goal(&self) -> Result<(), RemoteError> {
        self.delete(Collection::RaceGoal, CURRENT_DOC).await
    }

    pub async fn fetch_race_goal(&self) -> Result<Option<RaceGoal>, RemoteError> {
        let path = DocumentPath::current(self.require_user()?, Collection::RaceGoal);
        let doc: Option<RaceGoalDocument> = self.fetch_current(Collection::RaceGoal).await?;
        doc.map(|doc| {
            let race_date = decode_date(&doc.race_date).map_err(|e| RemoteError::Decode {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            Ok(RaceGoal::new(doc.race_name, race_date, doc.target_time_seconds))
        })
        .transpose()
    }
}

/// Widest gap between UTC offsets in use, UTC-12 to UTC+14.
const MAX_ZONE_SKEW_HOURS: i64 = 26;

/// Local week start closest to `start`, if `start` is a week start in some zone.
fn align_week_start(start: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let current = week_start(start);
    let next = shift_weeks(current, 1);
    let nearest = if start - current <= next - start { current } else { next };
    ((nearest - start).num_hours().abs() <= MAX_ZONE_SKEW_HOURS).then_some(nearest)
}

fn decode<T: DeserializeOwned>(path: &DocumentPath, value: Value) -> Result<T, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
