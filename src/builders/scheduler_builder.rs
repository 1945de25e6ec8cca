//! Builder to construct a scheduler from a registry.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{Registry, RequesterStore, Scheduler, SchedulerError};
use crate::util::{Clock, SystemClock};

/// Assembles a [`Scheduler`] from a populated [`Registry`].
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new(registry)
///     .with_config(SchedulerConfig::from_env()?)
///     .with_clock(Arc::new(ManualClock::new()))
///     .build()?;
/// ```
pub struct SchedulerBuilder<W> {
    registry: Registry<W>,
    config: Option<SchedulerConfig>,
    clock: Arc<dyn Clock>,
}

impl<W: RequesterStore> SchedulerBuilder<W> {
    /// Start from `registry`, on the system clock.
    #[must_use]
    pub fn new(registry: Registry<W>) -> Self {
        Self {
            registry,
            config: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the registry's configuration.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read wall-clock time from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration and start the worker pool.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidConfig` if validation fails,
    /// `SchedulerError::Pool` if the worker pool cannot start.
    pub fn build(self) -> Result<Scheduler<W>, SchedulerError> {
        let mut registry = self.registry;
        if let Some(config) = self.config {
            registry.set_config(config);
        }
        Scheduler::with_clock(registry, self.clock)
    }
}

impl<W> std::fmt::Debug for SchedulerBuilder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
