//! The explicit init/teardown pair owning both components.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::core::error::CoreError;
use crate::core::pipeline::LogPipeline;
use crate::core::scheduler::TaskScheduler;
use crate::infra::sink::ConsoleSink;
use crate::util::Clock;

/// Process-wide execution state: one [`LogPipeline`] and one
/// [`TaskScheduler`] wired to report into it.
///
/// Build it once at startup (usually through
/// [`ExecutionCoreBuilder`](crate::builders::ExecutionCoreBuilder)) and hand
/// clones of the component handles to whoever needs them.
pub struct ExecutionCore {
    config: CoreConfig,
    pipeline: Arc<LogPipeline>,
    scheduler: Arc<TaskScheduler>,
}

impl ExecutionCore {
    /// Start the pipeline, then the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the configuration is invalid or a thread
    /// cannot be spawned. A pipeline that started is shut down again if the
    /// scheduler then fails.
    pub fn start(
        config: CoreConfig,
        clock: Arc<dyn Clock>,
        console: Option<Arc<dyn ConsoleSink>>,
    ) -> Result<Self, CoreError> {
        config.validate().map_err(CoreError::InvalidConfig)?;

        let pipeline = LogPipeline::start(config.pipeline.clone(), clock, console)?;
        let scheduler = match TaskScheduler::start(&config.scheduler, Arc::clone(&pipeline)) {
            Ok(scheduler) => Arc::new(scheduler),
            Err(err) => {
                pipeline.shutdown();
                return Err(err.into());
            }
        };

        info!("execution core started");
        Ok(Self {
            config,
            pipeline,
            scheduler,
        })
    }

    /// The log pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<LogPipeline> {
        &self.pipeline
    }

    /// The task scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Configuration the core was started with.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Tear down in dependency order: stop the scheduler and let its workers
    /// finish (their failures still need the pipeline), drain the log queue,
    /// then stop the pipeline.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        if !self
            .scheduler
            .await_termination(self.config.scheduler.termination_timeout())
        {
            warn!("scheduler workers still busy at shutdown; detaching");
        }
        if !self.pipeline.flush(self.config.pipeline.flush_timeout()) {
            warn!("log queue not drained before shutdown");
        }
        self.pipeline.shutdown();
        info!("execution core shut down");
    }
}

impl std::fmt::Debug for ExecutionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionCore")
            .field("pipeline", &self.pipeline)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
