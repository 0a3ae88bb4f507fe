//! Scheduling event sinks.
//!
//! Event sinks give telemetry and tests a serialized record of every
//! scheduling decision, in exactly the order the loop made them. Rejected
//! requests are recorded too.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::task::TaskId;

/// What the scheduler decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingDecision {
    /// A schedule request was admitted and its action task spawned.
    Admitted,
    /// A schedule request was rejected because of unauthorized conflicts.
    Rejected,
    /// A resource set was freed after its owning task terminated.
    Released,
    /// A freed resource's default action was resubmitted.
    DefaultScheduled,
}

/// One scheduling decision, as recorded by the loop.
#[derive(Debug, Clone)]
pub struct SchedulingEvent {
    /// Task the decision concerns; `None` for rejections, where no task was
    /// ever spawned.
    pub task: Option<TaskId>,
    /// Diagnostic action name.
    pub action: String,
    /// Names of the resources involved.
    pub resources: String,
    /// The decision itself.
    pub decision: SchedulingDecision,
}

/// Sink abstraction for scheduling events.
pub trait EventSink: Send {
    /// Record one event. Called from the scheduler loop only.
    fn record(&mut self, event: SchedulingEvent);
}

/// In-memory sink with a bounded buffer, for tests and dev telemetry.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the scheduler.
#[derive(Clone)]
pub struct InMemoryEventSink {
    events: Arc<parking_lot::Mutex<VecDeque<SchedulingEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink retaining at most `max_events` entries, oldest dropped
    /// first.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(parking_lot::Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Snapshot of the recorded events, in decision order.
    pub fn events(&self) -> Vec<SchedulingEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, event: SchedulingEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}
