//! Log pipeline, task scheduler and the record model they share.

pub mod error;
pub mod format;
pub mod pipeline;
pub mod record;
pub mod scheduler;

pub use error::{AppResult, CoreError, FormatError, PipelineError, SchedulerError, SinkError};
pub use pipeline::{Delivery, LogPipeline, PipelineStats};
pub use record::{CapturedError, Level, LogArg, LogRecord};
pub use scheduler::{Cadence, SchedulerStats, TaskHandle, TaskId, TaskOutcome, TaskScheduler};
