//! Error types for scheduling and action outcomes.

use thiserror::Error;

/// Errors surfaced to `use_resources` callers.
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// A requested resource is in use and the caller did not authorize
    /// cancelling the conflicting owner. The action body never ran.
    #[error("action '{action}' is not allowed to cancel conflicts that are using {{ {resources} }}")]
    ConflictRejected {
        /// Name of the rejected action.
        action: String,
        /// Names of the conflicting resources.
        resources: String,
    },
    /// The action body returned an error; its resources were still released.
    #[error("action '{action}' failed: {cause}")]
    ActionFailed {
        /// Name of the failed action.
        action: String,
        /// The error returned by the action body.
        cause: anyhow::Error,
    },
    /// The action's task was evicted by a conflicting claim authorized to
    /// cancel it. Its resources were still released.
    #[error("action '{action}' was cancelled")]
    Cancelled {
        /// Name of the evicted action.
        action: String,
    },
    /// The scheduler loop is not running or has shut down.
    #[error("scheduler is not running")]
    SchedulerStopped,
    /// Scheduler configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
