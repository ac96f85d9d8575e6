//! Error types for the execution core.
//!
//! Only setup-time failures surface to callers. Everything that goes wrong on
//! the consumer thread or a worker thread is absorbed and recorded instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the task scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A caller-supplied value was rejected (e.g. a zero worker count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The scheduler no longer accepts submissions.
    #[error("scheduler has been shut down")]
    Shutdown,
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors produced while starting the log pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration validation failed.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    /// The consumer thread could not be spawned.
    #[error("failed to spawn log consumer thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors raised by a log sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The log directory could not be created.
    #[error("cannot create log directory {path}: {source}")]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A dated log file could not be opened.
    #[error("cannot open log file {path}: {source}")]
    Open {
        /// File that was being opened.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// Appending to the open log file failed.
    #[error("cannot write log file {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

/// Template substitution failures. These never reach callers; the raw
/// template is emitted instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A `{` or `}` without its partner.
    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
    /// A placeholder refers to an argument that was not supplied.
    #[error("missing argument {0}")]
    MissingArgument(usize),
    /// Placeholder content is neither empty nor an index.
    #[error("invalid placeholder `{{{0}}}`")]
    InvalidPlaceholder(String),
    /// The argument's `Display` implementation returned an error.
    #[error("argument {0} failed to display")]
    ArgumentDisplay(usize),
}

/// Errors produced while assembling the whole execution core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The log pipeline could not start.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The scheduler could not start.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Result type for task bodies and other application-facing code.
pub type AppResult<T> = Result<T, anyhow::Error>;
