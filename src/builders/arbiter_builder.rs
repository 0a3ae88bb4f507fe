//! Builder for configured scheduler instances.

use crate::config::ArbiterConfig;
use crate::core::{Arbiter, ArbiterError, ArbiterRunner, EventSink, Spawn};

/// Assembles an [`Arbiter`]/[`ArbiterRunner`] pair from configuration, an
/// optional event sink, and a task spawner.
#[derive(Default)]
pub struct ArbiterBuilder {
    config: ArbiterConfig,
    events: Option<Box<dyn EventSink>>,
}

impl ArbiterBuilder {
    /// Start from default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for the scheduler instance.
    #[must_use]
    pub fn config(mut self, config: ArbiterConfig) -> Self {
        self.config = config;
        self
    }

    /// Record every scheduling decision into `sink`.
    #[must_use]
    pub fn event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Validate the configuration and build the scheduler.
    ///
    /// The returned runner must be driven as a long-lived background task
    /// before any `use_resources` calls are issued.
    pub fn build<S: Spawn>(self, spawner: S) -> Result<(Arbiter, ArbiterRunner<S>), ArbiterError> {
        self.config.validate().map_err(ArbiterError::InvalidConfig)?;
        Ok(Arbiter::with_parts(self.config, self.events, spawner))
    }
}
