//! Pipeline and scheduler configuration structures.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::record::Level;
use crate::infra::sink::DEFAULT_MAX_LINES;

/// Log pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the dated log files.
    pub log_dir: PathBuf,
    /// File name prefix; files are `<prefix>-<yyyy-MM-dd>.log`.
    pub file_prefix: String,
    /// Records the queue holds before producers fall back to direct writes.
    pub queue_capacity: usize,
    /// Lines retained by the default console view.
    pub max_console_lines: usize,
    /// Route records to the console sink.
    pub console_enabled: bool,
    /// Route records to the file sink.
    pub file_enabled: bool,
    /// Records below this level are discarded at enqueue.
    pub min_level: Level,
    /// How long `ExecutionCore::shutdown` waits for the queue to drain.
    pub flush_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_prefix: "specter".into(),
            queue_capacity: 4096,
            max_console_lines: DEFAULT_MAX_LINES,
            console_enabled: true,
            file_enabled: true,
            min_level: Level::Trace,
            flush_timeout_ms: 2_000,
        }
    }
}

impl PipelineConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the file name prefix.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the console view's retained-line cap.
    #[must_use]
    pub const fn with_max_console_lines(mut self, lines: usize) -> Self {
        self.max_console_lines = lines;
        self
    }

    /// Enable or disable the console sink at start.
    #[must_use]
    pub const fn with_console_enabled(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    /// Enable or disable the file sink at start.
    #[must_use]
    pub const fn with_file_enabled(mut self, enabled: bool) -> Self {
        self.file_enabled = enabled;
        self
    }

    /// Set the minimum level.
    #[must_use]
    pub const fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Flush timeout as a [`Duration`].
    #[must_use]
    pub const fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.max_console_lines == 0 {
            return Err("max_console_lines must be greater than 0".into());
        }
        if self.file_prefix.trim().is_empty() {
            return Err("file_prefix must not be empty".into());
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err("file_prefix must not contain path separators".into());
        }
        Ok(())
    }
}

/// Task scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads; `None` means one per logical CPU.
    pub worker_count: Option<usize>,
    /// Worker thread name prefix; threads are `<prefix>-<n>`.
    pub thread_name_prefix: String,
    /// How long `ExecutionCore::shutdown` waits for workers to exit.
    pub termination_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            thread_name_prefix: "specter-scheduler".into(),
            termination_timeout_ms: 2_000,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Worker count after applying the CPU-count default.
    #[must_use]
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get)
    }

    /// Termination timeout as a [`Duration`].
    #[must_use]
    pub const fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == Some(0) {
            return Err("worker_count must be greater than 0".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }
}

/// Root configuration for the execution core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Log pipeline settings.
    pub pipeline: PipelineConfig,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
}

impl CoreConfig {
    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// Returns a description prefixed with the offending section.
    pub fn validate(&self) -> Result<(), String> {
        self.pipeline
            .validate()
            .map_err(|e| format!("pipeline invalid: {e}"))?;
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
