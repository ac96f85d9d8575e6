//! # Specter Exec
//!
//! Shared execution infrastructure for the Specter desktop application: an
//! asynchronous log pipeline and a scheduled-task dispatcher.
//!
//! Both components exist so that UI and network threads never block on disk
//! I/O or on each other.
//!
//! ## LogPipeline - Non-Blocking Logging
//!
//! Producers hand records to a bounded queue; a single consumer thread renders
//! them and routes them to a console view and a date-rotated log file.
//!
//! - **Enqueue never fails**: a full queue degrades to a synchronous write on
//!   the producer's thread, with one saturation warning per episode
//! - **Per-producer order**: records from one thread appear in the order they
//!   were submitted, fallback writes included
//! - **Daily rotation**: files are named `<prefix>-<yyyy-MM-dd>.log`
//! - **Self-contained failures**: a broken sink is reported to stderr and never
//!   reaches the caller
//!
//! ```rust,ignore
//! use specter_exec::{log_info, LogPipeline};
//! use specter_exec::config::PipelineConfig;
//! use specter_exec::util::system_clock;
//!
//! let pipeline = LogPipeline::start(PipelineConfig::new(), system_clock(), None)?;
//! log_info!(pipeline, "connected to {} in {}ms", host, elapsed);
//! ```
//!
//! ## TaskScheduler - Delayed and Repeating Work
//!
//! A pool of named worker threads runs one-off, fixed-rate and fixed-delay
//! tasks. A task that returns an error or panics is logged at ERROR and the
//! worker carries on; repeating tasks keep their schedule.
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! let handle = scheduler.schedule_with_fixed_delay(
//!     move || refresh_feeds(),
//!     Duration::ZERO,
//!     Duration::from_secs(60),
//! )?;
//! scheduler.cancel(&handle);
//! ```
//!
//! ## ExecutionCore - Explicit Lifecycle
//!
//! [`ExecutionCore`] owns one of each, started in one call and torn down in
//! dependency order (scheduler first, then the pipeline once it has drained).
//!
//! ```rust,ignore
//! use specter_exec::builders::ExecutionCoreBuilder;
//! use specter_exec::config::CoreConfig;
//!
//! let core = ExecutionCoreBuilder::new(CoreConfig::default()).build()?;
//! core.pipeline().info("started", vec![]);
//! core.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[macro_use]
mod macros;

/// Log records, formatting, the pipeline and the scheduler.
pub mod core;
/// Configuration models for the pipeline and the scheduler.
pub mod config;
/// Builders to assemble the execution core from configuration.
pub mod builders;
/// Sink adapters: console view and rolling log file.
pub mod infra;
/// Process-wide lifecycle of the execution core.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    CapturedError, Delivery, Level, LogArg, LogPipeline, TaskHandle, TaskScheduler,
};
pub use crate::runtime::ExecutionCore;
