//! Task identity and lifecycle handles used by the scheduler loop.
//!
//! A [`TaskHandle`] is the scheduler's view of one running action: a pair of
//! latched flags (cancel requested, terminated) plus the list of nested action
//! tasks scheduled under it. Cancellation and join both walk the child tree so
//! that evicting a base action unwinds its nested actions before the freed
//! resources are granted onward.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Opaque identifier of a scheduled action task.
///
/// Two resources owned by the same action report equal `TaskId`s; the value
/// itself is only meaningful for diagnostics and equality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

struct TaskShared {
    id: TaskId,
    cancel: watch::Sender<bool>,
    done: watch::Sender<bool>,
    children: parking_lot::Mutex<Vec<TaskHandle>>,
}

/// Shared handle to one action task's lifecycle state.
#[derive(Clone)]
pub(crate) struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId) -> Self {
        let (cancel, _) = watch::channel(false);
        let (done, _) = watch::channel(false);
        Self {
            shared: Arc::new(TaskShared {
                id,
                cancel,
                done,
                children: parking_lot::Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Register a nested action task under this one.
    pub(crate) fn add_child(&self, child: &TaskHandle) {
        self.shared.children.lock().push(child.clone());
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.shared.cancel.borrow()
    }

    pub(crate) fn is_done(&self) -> bool {
        *self.shared.done.borrow()
    }

    /// Latch the cancel flag on this task and every task nested under it.
    ///
    /// The flag is set before the child list is read, so a child registered
    /// concurrently is picked up either here or at registration time.
    pub(crate) fn cancel(&self) {
        let mut pending = vec![self.clone()];
        while let Some(handle) = pending.pop() {
            handle.shared.cancel.send_replace(true);
            pending.extend(handle.shared.children.lock().iter().cloned());
        }
    }

    /// Wait until the cancel flag is set. Observes an already-latched flag
    /// immediately.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.shared.cancel.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Mark this task as fully terminated, waking every joiner.
    pub(crate) fn mark_done(&self) {
        self.shared.done.send_replace(true);
    }

    /// Wait for this task and, transitively, every nested task to terminate.
    ///
    /// A task's child list is final once its done flag is set, so snapshotting
    /// children after awaiting each done flag covers the whole tree.
    pub(crate) async fn join(&self) {
        let mut pending = vec![self.clone()];
        while let Some(handle) = pending.pop() {
            {
                let mut rx = handle.shared.done.subscribe();
                let _ = rx.wait_for(|done| *done).await;
            }
            pending.extend(handle.shared.children.lock().iter().cloned());
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}
