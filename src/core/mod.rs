//! Core scheduling types: resources, actions, the message protocol, and the
//! scheduler loop.

pub mod action;
pub mod arbiter;
pub mod error;
pub mod events;
pub(crate) mod protocol;
pub mod resource;
pub mod task;

pub use action::{ActionContext, ActionResult, BoxedAction};
pub use arbiter::{Arbiter, ArbiterRunner, Spawn, DEFAULT_ACTION_NAME};
pub use error::ArbiterError;
pub use events::{EventSink, InMemoryEventSink, SchedulingDecision, SchedulingEvent};
pub use protocol::UseRequest;
pub use resource::{Resource, ResourceSet};
pub use task::TaskId;
