//! Action types and the claim token handed to running action bodies.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::arbiter::{submit, Arbiter};
use crate::core::error::ArbiterError;
use crate::core::protocol::{Message, UseRequest};
use crate::core::resource::{Resource, ResourceSet};
use crate::core::task::TaskHandle;

/// Outcome of one action body: completion or an application error.
pub type ActionResult = Result<(), anyhow::Error>;

/// A boxed, in-flight action body.
pub type BoxedAction = Pin<Box<dyn Future<Output = ActionResult> + Send + 'static>>;

/// One-shot constructor of an action body, invoked by the scheduler loop with
/// the task's claim token.
pub(crate) type ActionFn = Box<dyn FnOnce(ActionContext) -> BoxedAction + Send + 'static>;

/// Re-invocable constructor for a resource's default action.
pub(crate) type DefaultActionFn =
    Arc<dyn Fn(ActionContext) -> BoxedAction + Send + Sync + 'static>;

/// The resource-claim token of a running action.
///
/// Every action body receives an `ActionContext` carrying the complete
/// resource set its task owns (newly acquired plus inherited). Nested
/// [`use_resources`](Self::use_resources) calls go through this context so the
/// claim set propagates explicitly: resources already held are exempt from
/// conflict arbitration, which is what makes nested acquisition re-entrant
/// instead of self-deadlocking.
#[derive(Clone)]
pub struct ActionContext {
    tx: mpsc::UnboundedSender<Message>,
    held: Arc<ResourceSet>,
    task: TaskHandle,
}

impl ActionContext {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Message>,
        held: Arc<ResourceSet>,
        task: TaskHandle,
    ) -> Self {
        Self { tx, held, task }
    }

    /// Run a nested action with exclusive access to `request`'s resources.
    ///
    /// Resources this task already holds are not re-acquired and keep their
    /// current owner record; only the remainder goes through conflict
    /// resolution. Suspends until the nested action terminates and returns
    /// its outcome.
    ///
    /// When this nested action is evicted by a conflicting claim, the call
    /// returns [`ArbiterError::Cancelled`]; propagating that error with `?`
    /// unwinds the enclosing action as well, mirroring structured
    /// cancellation.
    pub async fn use_resources<F, Fut>(
        &self,
        request: UseRequest,
        action: F,
    ) -> Result<(), ArbiterError>
    where
        F: FnOnce(ActionContext) -> Fut + Send + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        submit(
            &self.tx,
            request,
            Arc::clone(&self.held),
            Some(self.task.clone()),
            Box::new(move |cx| -> BoxedAction { Box::pin(action(cx)) }),
        )
        .await
    }

    /// The complete resource set owned by this task, inherited claims
    /// included.
    pub fn held(&self) -> &ResourceSet {
        &self.held
    }

    /// Whether this task already holds `resource`.
    pub fn holds(&self, resource: &Arc<Resource>) -> bool {
        self.held.contains(resource)
    }

    /// A scheduler handle detached from this task's claim set.
    ///
    /// Requests issued through it arbitrate as top-level callers, conflicting
    /// even with resources this task holds.
    pub fn arbiter(&self) -> Arbiter {
        Arbiter::from_sender(self.tx.clone())
    }
}
