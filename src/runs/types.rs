//! Run record types.

use crate::calendar::truncate_to_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of run, which decides the pace target it is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunType {
    /// Easy aerobic (zone 2) run
    #[serde(rename = "ZONE2")]
    EasyAerobic,
    /// Tempo run
    #[serde(rename = "TEMPO")]
    Tempo,
}

impl RunType {
    /// Stable encoding used by both the local schema and remote documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::EasyAerobic => "ZONE2",
            RunType::Tempo => "TEMPO",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            RunType::EasyAerobic => "Zone 2",
            RunType::Tempo => "Tempo",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for RunType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZONE2" => Ok(RunType::EasyAerobic),
            "TEMPO" => Ok(RunType::Tempo),
            other => Err(UnknownVariant::new("run type", other)),
        }
    }
}

/// An encoded enum value that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Which enum was being decoded
    pub kind: &'static str,
    /// The rejected value
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A logged run. The id is assigned by the local store on insert and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Surrogate id (monotonic, never reused)
    pub id: i64,
    /// When the run happened (millisecond precision)
    pub date: DateTime<Utc>,
    /// Duration in whole minutes
    pub duration_minutes: u32,
    /// Easy aerobic or tempo
    pub run_type: RunType,
    /// Average pace in seconds per kilometre (> 0)
    pub pace_seconds_per_km: u32,
}

impl RunRecord {
    /// Whether the run falls in the half-open range `[start, end)`.
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.date >= start && self.date < end
    }
}

/// A run that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRun {
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub run_type: RunType,
    pub pace_seconds_per_km: u32,
}

impl NewRun {
    /// Create a run logged now.
    pub fn now(duration_minutes: u32, run_type: RunType, pace_seconds_per_km: u32) -> Self {
        Self {
            date: truncate_to_millis(Utc::now()),
            duration_minutes,
            run_type,
            pace_seconds_per_km,
        }
    }

    /// Attach the id assigned by the store.
    pub fn with_id(self, id: i64) -> RunRecord {
        RunRecord {
            id,
            date: self.date,
            duration_minutes: self.duration_minutes,
            run_type: self.run_type,
            pace_seconds_per_km: self.pace_seconds_per_km,
        }
    }
}
