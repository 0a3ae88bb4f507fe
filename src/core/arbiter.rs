//! The scheduler actor: a single serialized loop owning every scheduling
//! decision.
//!
//! All mutation of resource-ownership state happens inside
//! [`ArbiterRunner::run`], one message at a time, in strict arrival order.
//! That single-consumer FIFO is the whole correctness argument: conflict
//! detection, eviction and release never race because they are decided on one
//! logical thread, while callers and action bodies run as independent
//! cooperative tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::ArbiterConfig;
use crate::core::action::{ActionContext, ActionFn, BoxedAction};
use crate::core::error::ArbiterError;
use crate::core::events::{EventSink, SchedulingDecision, SchedulingEvent};
use crate::core::protocol::{Message, ReleaseNotification, ScheduleRequest, UseRequest};
use crate::core::resource::ResourceSet;
use crate::core::task::{TaskHandle, TaskId};

/// Diagnostic name given to automatically-relaunched default actions.
pub const DEFAULT_ACTION_NAME: &str = "Default";

/// Label used in diagnostics for requests scheduled without a name.
pub(crate) const UNNAMED_ACTION: &str = "<unnamed>";

/// Abstraction for spawning action tasks on a runtime.
pub trait Spawn {
    /// Spawn an async task.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Cloneable handle to a running scheduler loop.
///
/// The sole public entry point is [`use_resources`](Self::use_resources); the
/// paired [`ArbiterRunner`] must be running (spawned once, early, by the
/// surrounding robot-mode loop) before any requests are issued.
#[derive(Clone)]
pub struct Arbiter {
    tx: mpsc::UnboundedSender<Message>,
}

impl Arbiter {
    /// Create a scheduler with default configuration and no event sink.
    ///
    /// Returns the caller-facing handle and the loop, which the caller must
    /// drive as a long-lived background task:
    ///
    /// ```rust,ignore
    /// let (arbiter, runner) = Arbiter::new(TokioSpawner::new(Handle::current()));
    /// tokio::spawn(runner.run());
    /// ```
    pub fn new<S: Spawn>(spawner: S) -> (Self, ArbiterRunner<S>) {
        Self::with_parts(ArbiterConfig::default(), None, spawner)
    }

    pub(crate) fn with_parts<S: Spawn>(
        config: ArbiterConfig,
        events: Option<Box<dyn EventSink>>,
        spawner: S,
    ) -> (Self, ArbiterRunner<S>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let arbiter = Self { tx: tx.clone() };
        let runner = ArbiterRunner {
            rx,
            tx,
            spawner,
            config,
            events,
            next_task_id: 0,
        };
        (arbiter, runner)
    }

    pub(crate) fn from_sender(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Attempt to run `action` with exclusive access to the resources named
    /// in `request`.
    ///
    /// Suspends the caller until the action terminates. Returns `Ok(())` when
    /// the body completes, [`ArbiterError::ConflictRejected`] when a requested
    /// resource is in use and `cancel_conflicts` was not set (the body never
    /// runs), [`ArbiterError::ActionFailed`] when the body errors, and
    /// [`ArbiterError::Cancelled`] when the action is evicted by a later
    /// conflicting claim. Resources release unconditionally on termination.
    ///
    /// Calls are re-entrant through the [`ActionContext`] handed to the body:
    /// a nested request naming an already-held resource does not arbitrate
    /// against its own ancestry.
    pub async fn use_resources<F, Fut>(
        &self,
        request: UseRequest,
        action: F,
    ) -> Result<(), ArbiterError>
    where
        F: FnOnce(ActionContext) -> Fut + Send + 'static,
        Fut: Future<Output = crate::core::action::ActionResult> + Send + 'static,
    {
        submit(
            &self.tx,
            request,
            Arc::new(ResourceSet::new()),
            None,
            Box::new(move |cx| -> BoxedAction { Box::pin(action(cx)) }),
        )
        .await
    }
}

/// Enqueue a schedule request and suspend until the loop resolves it and the
/// action terminates.
pub(crate) async fn submit(
    tx: &mpsc::UnboundedSender<Message>,
    request: UseRequest,
    held: Arc<ResourceSet>,
    parent: Option<TaskHandle>,
    action: ActionFn,
) -> Result<(), ArbiterError> {
    let (completion, resolved) = oneshot::channel();
    tx.send(Message::Schedule(ScheduleRequest {
        requested: request.resources,
        held,
        parent,
        action,
        name: request.name,
        cancel_conflicts: request.cancel_conflicts,
        completion,
    }))
    .map_err(|_| ArbiterError::SchedulerStopped)?;
    resolved.await.map_err(|_| ArbiterError::SchedulerStopped)?
}

/// The scheduler loop. Obtained from [`Arbiter::new`] or the builder; consume
/// it with [`run`](Self::run) exactly once.
pub struct ArbiterRunner<S> {
    rx: mpsc::UnboundedReceiver<Message>,
    tx: mpsc::UnboundedSender<Message>,
    spawner: S,
    config: ArbiterConfig,
    events: Option<Box<dyn EventSink>>,
    next_task_id: u64,
}

impl<S: Spawn> ArbiterRunner<S> {
    /// Process scheduling messages forever, one at a time, in arrival order.
    ///
    /// Never blocks except while waiting for the next message, and never
    /// exits because of a scheduling-level error.
    pub async fn run(mut self) {
        tracing::info!(scheduler = %self.config.name, "action arbiter loop started");
        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Schedule(request) => self.handle_schedule(request),
                Message::Release(notification) => self.handle_release(notification),
            }
        }
        tracing::info!(scheduler = %self.config.name, "action arbiter loop stopped");
    }

    fn handle_schedule(&mut self, request: ScheduleRequest) {
        // Inherited resources are already exclusively the caller's; only the
        // remainder is acquired and arbitrated.
        let new_resources = request.requested.difference(&request.held);
        let all_resources = request.requested.union(&request.held);
        let action_label = request
            .name
            .clone()
            .unwrap_or_else(|| UNNAMED_ACTION.to_string());

        let conflicting: ResourceSet = new_resources
            .iter()
            .filter(|resource| resource.is_in_use())
            .cloned()
            .collect();

        if !request.cancel_conflicts && !conflicting.is_empty() {
            let names = conflicting.names();
            tracing::debug!(
                scheduler = %self.config.name,
                action = %action_label,
                resources = %names,
                "rejected conflicting schedule request"
            );
            self.record(SchedulingEvent {
                task: None,
                action: action_label.clone(),
                resources: names.clone(),
                decision: SchedulingDecision::Rejected,
            });
            let _ = request.completion.send(Err(ArbiterError::ConflictRejected {
                action: action_label,
                resources: names,
            }));
            return;
        }

        let conflicting_owners: Vec<TaskHandle> = conflicting
            .iter()
            .filter_map(|resource| resource.owner_handle())
            .collect();

        self.next_task_id += 1;
        let handle = TaskHandle::new(TaskId::new(self.next_task_id));

        if let Some(parent) = &request.parent {
            parent.add_child(&handle);
            // A nested request can arrive after its caller was evicted or
            // finished; the orphaned action must not run.
            if parent.is_cancelled() || parent.is_done() {
                handle.cancel();
            }
        }

        let context =
            ActionContext::new(self.tx.clone(), Arc::new(all_resources), handle.clone());

        if self.config.log_assignments {
            tracing::debug!(
                scheduler = %self.config.name,
                action = %action_label,
                resources = %new_resources.names(),
                task = %handle.id(),
                "resources assigned to action"
            );
        }
        self.record(SchedulingEvent {
            task: Some(handle.id()),
            action: action_label.clone(),
            resources: new_resources.names(),
            decision: SchedulingDecision::Admitted,
        });

        self.spawner.spawn(
            ActionTask {
                action_fn: request.action,
                context,
                handle: handle.clone(),
                conflicting_owners,
                resources: new_resources.clone(),
                tx: self.tx.clone(),
                completion: Some(request.completion),
                action: action_label,
            }
            .run(),
        );

        // Record ownership of the newly acquired resources only; inherited
        // ones keep their original owner. Later requests naming these
        // resources will cancel and await this task.
        for resource in new_resources.iter() {
            resource.assign(handle.clone(), request.name.clone());
        }
    }

    fn handle_release(&mut self, notification: ReleaseNotification) {
        for resource in notification.resources.iter() {
            let released_action = resource.current_action_name().unwrap_or_default();
            // A stale notification racing a newer owner must not free the
            // resource out from under it.
            if !resource.release_if_owned_by(notification.task) {
                continue;
            }
            if self.config.log_assignments {
                tracing::debug!(
                    scheduler = %self.config.name,
                    resource = %resource.name(),
                    task = %notification.task,
                    "resource released"
                );
            }
            self.record(SchedulingEvent {
                task: Some(notification.task),
                action: released_action,
                resources: resource.name().to_string(),
                decision: SchedulingDecision::Released,
            });

            if let Some(default_action) = resource.default_action() {
                // A default never fights over its resource: no conflict
                // cancellation, and a rejection goes unreported.
                let (completion, detached) = oneshot::channel();
                drop(detached);
                let _ = self.tx.send(Message::Schedule(ScheduleRequest {
                    requested: [Arc::clone(resource)].into_iter().collect(),
                    held: Arc::new(ResourceSet::new()),
                    parent: None,
                    action: Box::new(move |cx| default_action(cx)),
                    name: Some(DEFAULT_ACTION_NAME.to_string()),
                    cancel_conflicts: false,
                    completion,
                }));
                self.record(SchedulingEvent {
                    task: None,
                    action: DEFAULT_ACTION_NAME.to_string(),
                    resources: resource.name().to_string(),
                    decision: SchedulingDecision::DefaultScheduled,
                });
            }
        }
    }

    fn record(&mut self, event: SchedulingEvent) {
        if let Some(sink) = self.events.as_mut() {
            sink.record(event);
        }
    }
}

/// One spawned action task: eviction phase, body phase, guaranteed release.
///
/// The caller's closure is invoked here, never on the scheduler loop, so a
/// panic in caller code is contained by this task and the release guard; the
/// loop keeps scheduling.
struct ActionTask {
    action_fn: ActionFn,
    context: ActionContext,
    handle: TaskHandle,
    conflicting_owners: Vec<TaskHandle>,
    resources: ResourceSet,
    tx: mpsc::UnboundedSender<Message>,
    completion: Option<oneshot::Sender<Result<(), ArbiterError>>>,
    action: String,
}

impl ActionTask {
    async fn run(self) {
        let ActionTask {
            action_fn,
            context,
            handle,
            conflicting_owners,
            resources,
            tx,
            completion,
            action,
        } = self;

        // The guard owns the caller's completion channel and the release
        // notification, so both survive panics and eviction of this task.
        let mut guard = ReleaseGuard {
            tx,
            resources,
            handle: handle.clone(),
            completion,
            action: action.clone(),
        };

        // Eviction phase: the evicted owners must fully unwind (their own
        // release enqueued) before the new body runs. Cancellation of this
        // task is latched and only observed once eviction has finished, so a
        // mid-eviction cancel cannot abandon the claim half-transferred.
        for owner in &conflicting_owners {
            owner.cancel();
        }
        for owner in &conflicting_owners {
            owner.join().await;
        }

        // An orphaned task (parent already cancelled or finished by the time
        // the request reached the loop) must not execute any caller code.
        let result = if handle.is_cancelled() {
            Err(ArbiterError::Cancelled {
                action: action.clone(),
            })
        } else {
            let body = action_fn(context);
            tokio::select! {
                biased;
                () = handle.cancelled() => Err(ArbiterError::Cancelled {
                    action: action.clone(),
                }),
                outcome = body => outcome.map_err(|cause| ArbiterError::ActionFailed {
                    action: action.clone(),
                    cause,
                }),
            }
        };

        if let Some(completion) = guard.completion.take() {
            let _ = completion.send(result);
        }
        // Guard drop enqueues the release notification and marks the task
        // terminated, in that order.
    }
}

struct ReleaseGuard {
    tx: mpsc::UnboundedSender<Message>,
    resources: ResourceSet,
    handle: TaskHandle,
    completion: Option<oneshot::Sender<Result<(), ArbiterError>>>,
    action: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            let _ = completion.send(Err(ArbiterError::Cancelled {
                action: self.action.clone(),
            }));
        }
        let _ = self.tx.send(Message::Release(ReleaseNotification {
            resources: std::mem::take(&mut self.resources),
            task: self.handle.id(),
        }));
        self.handle.mark_done();
    }
}
