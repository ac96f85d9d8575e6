//! Builder for [`ExecutionCore`].

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::core::error::CoreError;
use crate::infra::sink::{ConsoleSink, RetainedConsole};
use crate::runtime::ExecutionCore;
use crate::util::{init_tracing, system_clock, Clock};

/// Assembles an [`ExecutionCore`] from configuration plus the collaborators
/// the configuration cannot express: the clock and the console view.
pub struct ExecutionCoreBuilder {
    config: CoreConfig,
    clock: Arc<dyn Clock>,
    console: Option<Arc<dyn ConsoleSink>>,
    install_tracing: bool,
}

impl ExecutionCoreBuilder {
    /// Start from `config`, the system clock and no console view.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            clock: system_clock(),
            console: None,
            install_tracing: false,
        }
    }

    /// Parse `json` as a [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] on parse or validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        CoreConfig::from_json_str(json)
            .map(Self::new)
            .map_err(CoreError::InvalidConfig)
    }

    /// Stamp records and name log files using `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send console output to `console`.
    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    /// Send console output to a new [`RetainedConsole`] sized from the
    /// configuration, and return it alongside the builder.
    #[must_use]
    pub fn with_retained_console(self) -> (Self, Arc<RetainedConsole>) {
        let console = Arc::new(RetainedConsole::new(self.config.pipeline.max_console_lines));
        let sink: Arc<dyn ConsoleSink> = console.clone();
        (self.with_console(sink), console)
    }

    /// Install the default stderr `tracing` subscriber on build, unless the
    /// host already has one.
    #[must_use]
    pub const fn with_tracing(mut self) -> Self {
        self.install_tracing = true;
        self
    }

    /// Start everything.
    ///
    /// # Errors
    ///
    /// See [`ExecutionCore::start`].
    pub fn build(self) -> Result<ExecutionCore, CoreError> {
        if self.install_tracing {
            init_tracing();
        }
        ExecutionCore::start(self.config, self.clock, self.console)
    }
}
