//! Message types exchanged between callers and the scheduler loop.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::core::action::ActionFn;
use crate::core::error::ArbiterError;
use crate::core::resource::{Resource, ResourceSet};
use crate::core::task::{TaskHandle, TaskId};

/// A caller's request for exclusive access to a set of resources.
///
/// Built with the builder methods and passed to
/// [`Arbiter::use_resources`](crate::core::Arbiter::use_resources) or
/// [`ActionContext::use_resources`](crate::core::ActionContext::use_resources).
#[derive(Debug)]
pub struct UseRequest {
    pub(crate) resources: ResourceSet,
    pub(crate) name: Option<String>,
    pub(crate) cancel_conflicts: bool,
}

impl UseRequest {
    /// Request exclusive access to `resources`.
    pub fn new<I>(resources: I) -> Self
    where
        I: IntoIterator<Item = Arc<Resource>>,
    {
        Self {
            resources: resources.into_iter().collect(),
            name: None,
            cancel_conflicts: false,
        }
    }

    /// Attach a human-readable action name for diagnostics and error
    /// messages.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Authorize the scheduler to evict conflicting owners instead of
    /// rejecting this request. Defaults to `false`.
    #[must_use]
    pub fn cancel_conflicts(mut self, cancel: bool) -> Self {
        self.cancel_conflicts = cancel;
        self
    }
}

/// Fully-assembled schedule request as enqueued to the loop.
pub(crate) struct ScheduleRequest {
    /// Resources the caller wants access to, held ones included.
    pub requested: ResourceSet,
    /// Claim token of the calling task; empty for top-level callers.
    pub held: Arc<ResourceSet>,
    /// Calling task, when the request is nested inside a running action.
    pub parent: Option<TaskHandle>,
    pub action: ActionFn,
    pub name: Option<String>,
    pub cancel_conflicts: bool,
    /// Resumes the suspended caller once the action terminates or the
    /// request is rejected.
    pub completion: oneshot::Sender<Result<(), ArbiterError>>,
}

/// Notification that an action task terminated and its newly-acquired
/// resources can be freed.
pub(crate) struct ReleaseNotification {
    /// The *newly acquired* set of the originating request; inherited
    /// resources stay with their original owner.
    pub resources: ResourceSet,
    pub task: TaskId,
}

/// The scheduler loop's mailbox protocol.
pub(crate) enum Message {
    Schedule(ScheduleRequest),
    Release(ReleaseNotification),
}
