//! Configuration models for the log pipeline and the task scheduler.

pub mod execution;

pub use execution::{CoreConfig, PipelineConfig, SchedulerConfig};
