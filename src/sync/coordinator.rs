//! Fire-and-forget remote pushes.

use super::error::RemoteError;
use super::mirror::RemoteMirror;
use super::status::{SyncStatus, SyncStatusSignal};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Background tasks tied to the application rather than to any caller.
///
/// Tracks how many spawned tasks are still running so shutdown and tests
/// can wait for pushes to drain. Also holds the status merged across every
/// coordinator spawning into the group.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    pending: Arc<watch::Sender<usize>>,
    status: SyncStatusSignal,
}

impl TaskGroup {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            pending: Arc::new(pending),
            status: SyncStatusSignal::new(),
        }
    }

    /// Latest push transition of any coordinator in the group.
    pub fn status(&self) -> &SyncStatusSignal {
        &self.status
    }

    /// Spawn `task` on the runtime and track it until it finishes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.send_modify(|n| *n += 1);
        let guard = PendingGuard(self.pending.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every spawned task has finished.
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the pending count even if the task panics.
struct PendingGuard(Arc<watch::Sender<usize>>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Pushes local writes to the remote mirror and reports the outcome.
///
/// There is no retry. A failed entity is re-sent only by its next local
/// write or by the one-time migration pass.
#[derive(Clone)]
pub struct SyncCoordinator {
    mirror: RemoteMirror,
    status: SyncStatusSignal,
    tasks: TaskGroup,
    name: &'static str,
}

impl SyncCoordinator {
    pub fn new(mirror: RemoteMirror, tasks: TaskGroup, name: &'static str) -> Self {
        Self {
            mirror,
            status: tasks.status().child(),
            tasks,
            name,
        }
    }

    pub fn status(&self) -> &SyncStatusSignal {
        &self.status
    }

    /// Launch `op` in the background. Call only after the local write committed.
    ///
    /// Skipped silently when no user is authenticated.
    pub fn push<F, Fut>(&self, what: impl Into<String>, op: F)
    where
        F: FnOnce(RemoteMirror) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let mirror = self.mirror.clone();
        let status = self.status.clone();
        let name = self.name;
        let what = what.into();

        self.tasks.spawn(async move {
            if !mirror.is_authenticated() {
                tracing::debug!("[{}] Skipping push of {}: not authenticated", name, what);
                return;
            }

            status.set(SyncStatus::Syncing);
            match op(mirror).await {
                Ok(()) => {
                    tracing::debug!("[{}] Pushed {}", name, what);
                    status.set(SyncStatus::Success);
                }
                Err(e) => {
                    tracing::warn!("[{}] Push of {} failed: {}", name, what, e);
                    status.set(SyncStatus::Error(e.to_string()));
                }
            }
        });
    }
}
