//! The public [`TaskScheduler`] front end.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::pool::WorkerPool;
use super::{Cadence, Job, Registry, SchedulerStats, TaskHandle, TaskOutcome, TaskState};
use crate::config::SchedulerConfig;
use crate::core::error::SchedulerError;
use crate::core::pipeline::LogPipeline;

/// Process-wide scheduler for delayed and repeating work.
///
/// Submission never blocks. Task bodies run on worker threads named
/// `<prefix>-<n>`; a failing body is logged at ERROR through the pipeline
/// and never takes a worker down.
pub struct TaskScheduler {
    registry: Arc<Registry>,
    pool: RwLock<Arc<WorkerPool>>,
    accepting: AtomicBool,
    next_id: AtomicU64,
}

impl TaskScheduler {
    /// Start a scheduler that reports task failures to `reporter`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] for an invalid
    /// configuration or [`SchedulerError::Spawn`] if a worker cannot start.
    pub fn start(
        config: &SchedulerConfig,
        reporter: Arc<LogPipeline>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidArgument)?;
        let registry = Arc::new(Registry::new(reporter, config.thread_name_prefix.clone()));
        let worker_count = config.effective_worker_count();
        let pool = WorkerPool::start(worker_count, Arc::clone(&registry))?;

        info!(worker_count, "task scheduler started");
        Ok(Self {
            registry,
            pool: RwLock::new(pool),
            accepting: AtomicBool::new(true),
            next_id: AtomicU64::new(0),
        })
    }

    /// Run `task` once after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule_once<F, R>(&self, task: F, delay: Duration) -> Result<TaskHandle, SchedulerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: TaskOutcome,
    {
        let mut slot = Some(task);
        let job: Job = Box::new(move || match slot.take() {
            Some(task) => task().into_result(),
            None => Ok(()),
        });
        self.submit(std::any::type_name::<F>(), Cadence::Once, job, delay)
    }

    /// Run `task` once as soon as a worker is free.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule_now<F, R>(&self, task: F) -> Result<TaskHandle, SchedulerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: TaskOutcome,
    {
        self.schedule_once(task, Duration::ZERO)
    }

    /// Run `task` every `period`, measured from when each run was due.
    ///
    /// A run that overruns pushes the next one to start as soon as it
    /// returns; runs of the same task never overlap.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] for a zero period or
    /// [`SchedulerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule_at_fixed_rate<F, R>(
        &self,
        task: F,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<TaskHandle, SchedulerError>
    where
        F: FnMut() -> R + Send + 'static,
        R: TaskOutcome,
    {
        if period.is_zero() {
            return Err(SchedulerError::InvalidArgument("period must be greater than zero".into()));
        }
        let job = repeating_job(task);
        self.submit(std::any::type_name::<F>(), Cadence::FixedRate(period), job, initial_delay)
    }

    /// [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate) with no
    /// initial delay.
    ///
    /// # Errors
    ///
    /// As for [`schedule_at_fixed_rate`](Self::schedule_at_fixed_rate).
    pub fn schedule_at_fixed_rate_now<F, R>(
        &self,
        task: F,
        period: Duration,
    ) -> Result<TaskHandle, SchedulerError>
    where
        F: FnMut() -> R + Send + 'static,
        R: TaskOutcome,
    {
        self.schedule_at_fixed_rate(task, Duration::ZERO, period)
    }

    /// Run `task` repeatedly, waiting `delay` after each run ends.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] for a zero delay or
    /// [`SchedulerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn schedule_with_fixed_delay<F, R>(
        &self,
        task: F,
        initial_delay: Duration,
        delay: Duration,
    ) -> Result<TaskHandle, SchedulerError>
    where
        F: FnMut() -> R + Send + 'static,
        R: TaskOutcome,
    {
        if delay.is_zero() {
            return Err(SchedulerError::InvalidArgument("delay must be greater than zero".into()));
        }
        let job = repeating_job(task);
        self.submit(std::any::type_name::<F>(), Cadence::FixedDelay(delay), job, initial_delay)
    }

    /// Cancel a task. A run already in progress completes; no further run
    /// starts. Returns `true` if this call did the cancelling.
    pub fn cancel(&self, handle: &TaskHandle) -> bool {
        let cancelled = handle.cancel();
        if cancelled {
            debug!(task_id = handle.id(), "task cancelled");
        }
        cancelled
    }

    /// Replace the worker pool with one of `worker_count` threads.
    ///
    /// Tasks queued on the old pool that have not started are discarded and
    /// their handles report finished. Runs in progress complete on the old
    /// threads, which then exit.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] if `worker_count` is zero,
    /// leaving the current pool untouched. Returns
    /// [`SchedulerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub fn resize(&self, worker_count: usize) -> Result<(), SchedulerError> {
        if worker_count == 0 {
            return Err(SchedulerError::InvalidArgument(
                "worker count must be positive".into(),
            ));
        }
        if !self.accepting.load(Ordering::Acquire) {
            return Err(SchedulerError::Shutdown);
        }

        let replacement = WorkerPool::start(worker_count, Arc::clone(&self.registry))?;
        let previous = {
            let mut current = self.pool.write();
            // A concurrent shutdown only saw the old pool.
            if !self.accepting.load(Ordering::Acquire) {
                drop(current);
                replacement.stop();
                return Err(SchedulerError::Shutdown);
            }
            std::mem::replace(&mut *current, replacement)
        };
        let abandoned = previous.stop();
        for task in &abandoned {
            self.registry.finish(task);
        }

        info!(
            worker_count,
            previous = previous.worker_count(),
            abandoned = abandoned.len(),
            "scheduler pool replaced"
        );
        Ok(())
    }

    /// Worker threads in the current pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.read().worker_count()
    }

    /// Stop accepting submissions. Idempotent.
    ///
    /// Queued one-off tasks still run; repeating tasks stop after any run in
    /// progress. Nothing is interrupted.
    pub fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::AcqRel) {
            return;
        }
        let dropped = self.pool.read().shutdown();
        for task in &dropped {
            self.registry.finish(task);
        }
        info!(stopped_repeating = dropped.len(), "task scheduler shutting down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        !self.accepting.load(Ordering::Acquire)
    }

    /// After [`shutdown`](Self::shutdown), wait for the workers to exit.
    /// Returns `true` if they did within `timeout`.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let pool = Arc::clone(&self.pool.read());
        pool.await_termination(timeout)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let pool = self.pool.read();
        let counters = &self.registry.counters;
        SchedulerStats {
            worker_count: pool.worker_count(),
            pending: pool.pending(),
            live_tasks: self.registry.live_count(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            runs: counters.runs.load(Ordering::Relaxed),
            failed_runs: counters.failed_runs.load(Ordering::Relaxed),
        }
    }

    fn submit(
        &self,
        type_name: &str,
        cadence: Cadence,
        job: Job,
        delay: Duration,
    ) -> Result<TaskHandle, SchedulerError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(SchedulerError::Shutdown);
        }

        let due = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| SchedulerError::InvalidArgument("delay too large".into()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let state = Arc::new(TaskState::new(id, format!("#{id} ({type_name})"), cadence, job));
        self.registry.track(&state);

        if let Err(err) = self.pool.read().push(Arc::clone(&state), due) {
            self.registry.finish(&state);
            return Err(err);
        }

        self.registry.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(task_id = id, ?cadence, ?delay, "task scheduled");
        Ok(TaskHandle::new(state))
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // Signal only; workers finish queued one-off tasks and exit.
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("stats", &self.stats())
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

fn repeating_job<F, R>(mut task: F) -> Job
where
    F: FnMut() -> R + Send + 'static,
    R: TaskOutcome,
{
    Box::new(move || task().into_result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::util::system_clock;

    fn scheduler(workers: usize) -> TaskScheduler {
        let pipeline =
            LogPipeline::start(PipelineConfig::new().with_file_enabled(false), system_clock(), None)
                .unwrap();
        TaskScheduler::start(&SchedulerConfig::new().with_worker_count(workers), pipeline).unwrap()
    }

    #[test]
    fn zero_period_is_rejected() {
        let scheduler = scheduler(1);
        let err = scheduler
            .schedule_at_fixed_rate(|| (), Duration::ZERO, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)));
        let err = scheduler
            .schedule_with_fixed_delay(|| (), Duration::ZERO, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)));
    }

    #[test]
    fn labels_carry_id_and_closure_type() {
        let scheduler = scheduler(1);
        let handle = scheduler.schedule_once(|| (), Duration::from_secs(60)).unwrap();
        assert!(handle.label().starts_with("#1 ("));
        assert!(handle.label().contains("closure"));
        assert_eq!(scheduler.stats().live_tasks, 1);
    }

    #[test]
    fn cancelled_before_due_never_runs() {
        let scheduler = scheduler(1);
        let handle = scheduler.schedule_once(|| (), Duration::from_millis(50)).unwrap();
        assert!(scheduler.cancel(&handle));
        assert!(!scheduler.cancel(&handle));

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(handle.run_count(), 0);
        assert!(handle.is_finished());
        assert_eq!(scheduler.stats().live_tasks, 0);
    }
}
