//! Shared sync status signal.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// State of the most recent remote push.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    /// Last push failed; carries a readable message.
    Error(String),
}

impl SyncStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error(_))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "Idle"),
            SyncStatus::Syncing => write!(f, "Syncing"),
            SyncStatus::Success => write!(f, "Success"),
            SyncStatus::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Status shared by every push of one repository.
///
/// Concurrent pushes write to the same signal, so readers see interleaved
/// transitions rather than a per-entity receipt. A signal made with
/// [`SyncStatusSignal::child`] also writes each transition to its parent.
#[derive(Debug, Clone)]
pub struct SyncStatusSignal {
    tx: Arc<watch::Sender<SyncStatus>>,
    parent: Option<Arc<watch::Sender<SyncStatus>>>,
}

impl SyncStatusSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            tx: Arc::new(tx),
            parent: None,
        }
    }

    /// New signal whose transitions are mirrored into `self`.
    pub fn child(&self) -> Self {
        let (tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            tx: Arc::new(tx),
            parent: Some(self.tx.clone()),
        }
    }

    pub fn set(&self, status: SyncStatus) {
        if let Some(parent) = &self.parent {
            parent.send_replace(status.clone());
        }
        self.tx.send_replace(status);
    }

    pub fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }
}

impl Default for SyncStatusSignal {
    fn default() -> Self {
        Self::new()
    }
}
