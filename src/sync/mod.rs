//! Remote mirror synchronization.
//!
//! Local writes are authoritative. Repositories push each committed write
//! to the per-user remote mirror in the background, and reconciliation
//! restores or uploads everything once at start-up.

pub mod coordinator;
pub mod document;
pub mod error;
pub mod mirror;
pub mod reconcile;
pub mod repository;
pub mod status;

pub use coordinator::{SyncCoordinator, TaskGroup};
pub use document::{Collection, DocumentPath, DocumentStore, HttpDocumentStore, MemoryDocumentStore};
pub use error::RemoteError;
pub use mirror::RemoteMirror;
pub use reconcile::{PhaseOutcome, ReconcileError, ReconcileReport, ReconciliationManager};
pub use repository::{
    AchievementRepository, ProfileRepository, RaceGoalRepository, RunRepository, TargetRepository,
};
pub use status::{SyncStatus, SyncStatusSignal};
