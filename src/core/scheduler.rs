//! Shared scheduled-task dispatcher.
//!
//! A fixed-size pool of named worker threads pulls tasks from a delay queue.
//! Tasks are one-off, fixed-rate or fixed-delay; every run is wrapped so that
//! an error or panic is logged through the [`LogPipeline`] and the worker
//! moves on.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! let scheduler = TaskScheduler::start(&SchedulerConfig::new(), pipeline.clone())?;
//! let poll = scheduler.schedule_at_fixed_rate(
//!     move || inbox.poll(),
//!     Duration::ZERO,
//!     Duration::from_secs(30),
//! )?;
//! // later
//! scheduler.cancel(&poll);
//! ```

mod dispatcher;
mod pool;

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::error::AppResult;
use crate::core::pipeline::{Delivery, LogPipeline};
use crate::core::record::{CapturedError, Level, LogArg};

pub use dispatcher::TaskScheduler;

/// Identifier assigned to each submission.
pub type TaskId = u64;

/// How a task repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Runs once.
    Once,
    /// Next run is due `period` after the previous run was due.
    FixedRate(Duration),
    /// Next run is due `delay` after the previous run ended.
    FixedDelay(Duration),
}

impl Cadence {
    /// Whether the task runs more than once.
    #[must_use]
    pub const fn is_repeating(self) -> bool {
        !matches!(self, Self::Once)
    }
}

/// Values a task body may return.
///
/// `()` is always a success. `Result<(), E>` reports `Err` as a task failure.
pub trait TaskOutcome {
    /// Normalise into a result.
    ///
    /// # Errors
    ///
    /// Returns the task's own failure.
    fn into_result(self) -> AppResult<()>;
}

impl TaskOutcome for () {
    fn into_result(self) -> AppResult<()> {
        Ok(())
    }
}

impl<E> TaskOutcome for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> AppResult<()> {
        self.map_err(Into::into)
    }
}

pub(crate) type Job = Box<dyn FnMut() -> AppResult<()> + Send>;

/// State of one submission, shared by its handle and the pool.
pub(crate) struct TaskState {
    id: TaskId,
    label: String,
    cadence: Cadence,
    job: Mutex<Job>,
    cancelled: AtomicBool,
    finished: AtomicBool,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl TaskState {
    pub(crate) fn new(id: TaskId, label: String, cadence: Cadence, job: Job) -> Self {
        Self {
            id,
            label,
            cadence,
            job: Mutex::new(job),
            cancelled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub(crate) const fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Run the body once. Errors and panics come back as a [`CapturedError`].
    pub(crate) fn invoke(&self) -> Result<(), CapturedError> {
        let mut job = self.job.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*job)()));
        self.runs.fetch_add(1, Ordering::AcqRel);
        let failure = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => CapturedError::from_anyhow(&err),
            Err(payload) => CapturedError::from_panic(payload.as_ref()),
        };
        self.failures.fetch_add(1, Ordering::AcqRel);
        Err(failure)
    }
}

/// Handle to a submitted task.
#[derive(Clone)]
pub struct TaskHandle {
    state: Arc<TaskState>,
}

impl TaskHandle {
    pub(crate) const fn new(state: Arc<TaskState>) -> Self {
        Self { state }
    }

    /// Submission identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.state.id
    }

    /// Identity used in failure reports.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.state.label
    }

    /// Repetition policy.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        self.state.cadence
    }

    /// Prevent any run that has not started yet. A run in progress completes.
    ///
    /// Returns `true` if this call did the cancelling.
    pub fn cancel(&self) -> bool {
        !self.state.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Whether the task will never run again (done, cancelled and dequeued,
    /// or discarded by a resize or shutdown).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    /// Completed runs, failed ones included.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.state.runs.load(Ordering::Acquire)
    }

    /// Runs that returned an error or panicked.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.state.failures.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("cadence", &self.cadence())
            .field("cancelled", &self.is_cancelled())
            .field("runs", &self.run_count())
            .finish()
    }
}

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Worker threads in the current pool.
    pub worker_count: usize,
    /// Tasks waiting for their due time.
    pub pending: usize,
    /// Tasks that may still run.
    pub live_tasks: usize,
    /// Successful submissions.
    pub submitted: u64,
    /// Completed runs across all tasks.
    pub runs: u64,
    /// Runs that failed.
    pub failed_runs: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub runs: AtomicU64,
    pub failed_runs: AtomicU64,
}

/// State shared by the dispatcher and every pool generation.
pub(crate) struct Registry {
    reporter: Arc<LogPipeline>,
    live: Mutex<HashMap<TaskId, Arc<TaskState>>>,
    pub counters: SchedulerCounters,
    thread_counter: AtomicUsize,
    thread_prefix: String,
}

impl Registry {
    pub(crate) fn new(reporter: Arc<LogPipeline>, thread_prefix: String) -> Self {
        Self {
            reporter,
            live: Mutex::new(HashMap::new()),
            counters: SchedulerCounters::default(),
            thread_counter: AtomicUsize::new(0),
            thread_prefix,
        }
    }

    /// Next worker thread name. The counter never resets.
    pub(crate) fn next_thread_name(&self) -> String {
        let n = self.thread_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.thread_prefix)
    }

    pub(crate) fn track(&self, task: &Arc<TaskState>) {
        self.live.lock().insert(task.id, Arc::clone(task));
    }

    pub(crate) fn finish(&self, task: &TaskState) {
        task.finished.store(true, Ordering::Release);
        self.live.lock().remove(&task.id);
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub(crate) fn record_run(&self, task: &TaskState, outcome: Result<(), CapturedError>) {
        self.counters.runs.fetch_add(1, Ordering::Relaxed);
        let Err(error) = outcome else {
            return;
        };
        self.counters.failed_runs.fetch_add(1, Ordering::Relaxed);
        self.report(task, "failed", error);
    }

    /// The next run time of a repeating task does not fit in an `Instant`.
    pub(crate) fn record_unschedulable(&self, task: &TaskState) {
        let error = CapturedError::new("SchedulerError", "next run time is out of range");
        self.report(task, "will not run again", error);
    }

    fn report(&self, task: &TaskState, what: &str, error: CapturedError) {
        let delivery = self.reporter.enqueue(
            Level::Error,
            "scheduled task {} {}",
            vec![LogArg::new(task.label.clone()), LogArg::new(what.to_owned())],
            Some(error.clone()),
        );
        if matches!(delivery, Delivery::Closed | Delivery::Filtered) {
            // Never let a failure vanish without a trace.
            eprintln!("scheduled task {} {what}: {error}", task.label);
        }
    }
}
