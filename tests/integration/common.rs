//! Shared fixtures for integration tests.

use chrono::{DateTime, Duration, Utc};
use paceline::calendar::{week_start, FixedClock};
use paceline::identity::{IdentityProvider, LocalIdentity};
use paceline::storage::{FlagStore, LocalStore};
use paceline::sync::MemoryDocumentStore;
use paceline::{NewRun, RunType, TrainingCore};
use std::sync::Arc;

/// A core over in-memory storage, signed in as `user_id`, with its clock pinned to `now`.
pub struct Harness {
    pub core: TrainingCore,
    pub local: Arc<LocalStore>,
    pub remote: Arc<MemoryDocumentStore>,
    pub flags: Arc<FlagStore>,
}

pub fn harness(remote: Arc<MemoryDocumentStore>, user_id: &str, now: DateTime<Utc>) -> Harness {
    harness_with_flags(remote, Arc::new(FlagStore::in_memory()), user_id, now)
}

pub fn harness_with_flags(
    remote: Arc<MemoryDocumentStore>,
    flags: Arc<FlagStore>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Harness {
    let local = Arc::new(LocalStore::open_in_memory().expect("in-memory store"));
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(LocalIdentity::new(flags.clone(), Some(user_id.to_string())));
    let core = TrainingCore::with_components(
        local.clone(),
        flags.clone(),
        remote.clone(),
        identity,
        Arc::new(FixedClock(now)),
    );
    Harness {
        core,
        local,
        remote,
        flags,
    }
}

/// Wednesday noon (or thereabouts) of the current local week.
pub fn mid_week() -> DateTime<Utc> {
    week_start(Utc::now()) + Duration::days(2) + Duration::hours(12)
}

pub fn easy_run(date: DateTime<Utc>, minutes: u32) -> NewRun {
    NewRun {
        date,
        duration_minutes: minutes,
        run_type: RunType::EasyAerobic,
        pace_seconds_per_km: 390,
    }
}
