//! Non-blocking log pipeline with a single consumer thread.
//!
//! Producers build a [`LogRecord`] on their own thread (timestamp included)
//! and `try_send` it into a bounded crossbeam channel. One consumer thread
//! renders each record and routes it to the enabled sinks.
//!
//! # Overflow
//!
//! When the channel is full the record is not dropped. The producer takes the
//! sink lock, drains whatever is still queued, emits one saturation warning
//! per episode, and writes its record straight to the file sink. Because every
//! pop-and-write happens under that same lock, a fallback record can never
//! overtake records its producer queued earlier.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError, TrySendError};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::core::error::{PipelineError, SinkError};
use crate::core::format;
use crate::core::record::{CapturedError, Level, LogArg, LogRecord};
use crate::infra::sink::{ConsoleSink, RollingFileSink};
use crate::util::Clock;

/// Name of the consumer thread.
pub const CONSUMER_THREAD_NAME: &str = "specter-log-consumer";

/// What happened to a record handed to [`LogPipeline::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the consumer thread.
    Queued,
    /// Queue was full; written synchronously on the caller's thread.
    Fallback,
    /// Below the configured minimum level.
    Filtered,
    /// The pipeline has shut down; nothing was written.
    Closed,
}

/// Snapshot of pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records currently waiting in the queue.
    pub queued: usize,
    /// Records accepted into the queue since start.
    pub accepted: u64,
    /// Records taken off the queue and routed to sinks.
    pub drained: u64,
    /// Records written synchronously because the queue was full.
    pub fallback_writes: u64,
    /// Records rendered with their raw template after substitution failed.
    pub template_failures: u64,
    /// Sink failures absorbed (open/write errors, panics while rendering).
    pub sink_failures: u64,
    /// Records discarded by the minimum-level filter.
    pub filtered: u64,
}

#[derive(Debug, Default)]
struct PipelineCounters {
    accepted: AtomicU64,
    fallback_writes: AtomicU64,
    template_failures: AtomicU64,
    sink_failures: AtomicU64,
    filtered: AtomicU64,
}

enum FileSlot {
    /// Not opened yet; opened on the first write while enabled.
    Pending,
    Open(RollingFileSink),
    /// Setup failed; file logging stays off for the rest of the run.
    Failed,
    Closed,
}

struct Sinks {
    console: Option<Arc<dyn ConsoleSink>>,
    file: FileSlot,
}

struct Shared {
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    receiver: Receiver<LogRecord>,
    /// Held for every pop-and-write, by the consumer or an overflowing producer.
    sinks: Mutex<Sinks>,
    console_enabled: AtomicBool,
    file_enabled: AtomicBool,
    running: AtomicBool,
    saturated: AtomicBool,
    counters: PipelineCounters,
    drained: Mutex<u64>,
    drained_cv: Condvar,
}

/// Process-wide asynchronous log pipeline.
///
/// Construct once with [`LogPipeline::start`] and share the returned `Arc`
/// with every producer.
pub struct LogPipeline {
    shared: Arc<Shared>,
    sender: RwLock<Option<Sender<LogRecord>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl LogPipeline {
    /// Validate `config`, open the file sink if enabled and spawn the consumer.
    ///
    /// A file sink that cannot be created does not fail startup: file logging
    /// is disabled and an ERROR record describing why goes to the console.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a bad configuration or
    /// [`PipelineError::Spawn`] if the consumer thread cannot be started.
    pub fn start(
        config: PipelineConfig,
        clock: Arc<dyn Clock>,
        console: Option<Arc<dyn ConsoleSink>>,
    ) -> Result<Arc<Self>, PipelineError> {
        config.validate().map_err(PipelineError::InvalidConfig)?;

        let (sender, receiver) = bounded(config.queue_capacity);
        let shared = Arc::new(Shared {
            console_enabled: AtomicBool::new(config.console_enabled),
            file_enabled: AtomicBool::new(config.file_enabled),
            config,
            clock,
            receiver,
            sinks: Mutex::new(Sinks {
                console,
                file: FileSlot::Pending,
            }),
            running: AtomicBool::new(true),
            saturated: AtomicBool::new(false),
            counters: PipelineCounters::default(),
            drained: Mutex::new(0),
            drained_cv: Condvar::new(),
        });

        if shared.file_enabled.load(Ordering::Acquire) {
            let mut sinks = shared.sinks.lock();
            shared.open_file(&mut sinks);
        }

        let consumer = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(CONSUMER_THREAD_NAME.into())
                .spawn(move || shared.consume())
                .map_err(PipelineError::Spawn)?
        };

        info!(
            queue_capacity = shared.config.queue_capacity,
            log_dir = %shared.config.log_dir.display(),
            "log pipeline started"
        );

        Ok(Arc::new(Self {
            shared,
            sender: RwLock::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
        }))
    }

    /// Submit a record. Never fails and never waits for I/O unless the queue
    /// is full, in which case the record is written on this thread.
    pub fn enqueue(
        &self,
        level: Level,
        message: impl Into<String>,
        args: Vec<LogArg>,
        error: Option<CapturedError>,
    ) -> Delivery {
        if level < self.shared.config.min_level {
            self.shared.counters.filtered.fetch_add(1, Ordering::Relaxed);
            return Delivery::Filtered;
        }
        let record = LogRecord::new(level, message, args, error, self.shared.clock.now());
        self.push(record)
    }

    /// Log at TRACE.
    pub fn trace(&self, message: impl Into<String>, args: Vec<LogArg>) -> Delivery {
        self.enqueue(Level::Trace, message, args, None)
    }

    /// Log at DEBUG.
    pub fn debug(&self, message: impl Into<String>, args: Vec<LogArg>) -> Delivery {
        self.enqueue(Level::Debug, message, args, None)
    }

    /// Log at INFO.
    pub fn info(&self, message: impl Into<String>, args: Vec<LogArg>) -> Delivery {
        self.enqueue(Level::Info, message, args, None)
    }

    /// Log at WARN.
    pub fn warn(&self, message: impl Into<String>, args: Vec<LogArg>) -> Delivery {
        self.enqueue(Level::Warn, message, args, None)
    }

    /// Log at ERROR.
    pub fn error(&self, message: impl Into<String>, args: Vec<LogArg>) -> Delivery {
        self.enqueue(Level::Error, message, args, None)
    }

    /// Log at WARN with an attached failure.
    pub fn warn_with(&self, message: impl Into<String>, error: CapturedError) -> Delivery {
        self.enqueue(Level::Warn, message, Vec::new(), Some(error))
    }

    /// Log at ERROR with an attached failure.
    pub fn error_with(&self, message: impl Into<String>, error: CapturedError) -> Delivery {
        self.enqueue(Level::Error, message, Vec::new(), Some(error))
    }

    fn push(&self, record: LogRecord) -> Delivery {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            return Delivery::Closed;
        };

        match tx.try_send(record) {
            Ok(()) => {
                self.shared.counters.accepted.fetch_add(1, Ordering::Release);
                if self.shared.saturated.load(Ordering::Relaxed) {
                    self.shared.saturated.store(false, Ordering::Relaxed);
                }
                Delivery::Queued
            }
            Err(TrySendError::Full(record)) => {
                drop(sender);
                self.shared.write_through(record)
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Closed,
        }
    }

    /// Route subsequent records to the console sink or stop doing so.
    pub fn set_console_enabled(&self, enabled: bool) {
        self.shared.console_enabled.store(enabled, Ordering::Release);
    }

    /// Route subsequent records to the file sink or stop doing so.
    ///
    /// Has no effect once file setup has failed.
    pub fn set_file_enabled(&self, enabled: bool) {
        self.shared.file_enabled.store(enabled, Ordering::Release);
    }

    /// Whether records are routed to the console sink.
    #[must_use]
    pub fn is_console_enabled(&self) -> bool {
        self.shared.console_enabled.load(Ordering::Acquire)
    }

    /// Whether records are routed to the file sink.
    #[must_use]
    pub fn is_file_enabled(&self) -> bool {
        self.shared.file_enabled.load(Ordering::Acquire)
    }

    /// Register (or replace) the console sink.
    pub fn set_console_sink(&self, console: Arc<dyn ConsoleSink>) {
        self.shared.sinks.lock().console = Some(console);
    }

    /// Clear the console view.
    pub fn clear_console(&self) {
        if let Some(console) = self.shared.sinks.lock().console.as_ref() {
            console.clear();
        }
    }

    /// The clock records are stamped with.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.shared.clock
    }

    /// Whether the pipeline still accepts records.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        let counters = &self.shared.counters;
        PipelineStats {
            queued: self.shared.receiver.len(),
            accepted: counters.accepted.load(Ordering::Acquire),
            drained: *self.shared.drained.lock(),
            fallback_writes: counters.fallback_writes.load(Ordering::Relaxed),
            template_failures: counters.template_failures.load(Ordering::Relaxed),
            sink_failures: counters.sink_failures.load(Ordering::Relaxed),
            filtered: counters.filtered.load(Ordering::Relaxed),
        }
    }

    /// Block until every record queued before this call has reached the
    /// sinks, or `timeout` passes. Returns `true` if the queue caught up.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let shared = &self.shared;
        let mut drained = shared.drained.lock();
        while *drained < shared.counters.accepted.load(Ordering::Acquire) {
            if !shared.running.load(Ordering::Acquire) {
                return false;
            }
            if shared.drained_cv.wait_until(&mut drained, deadline).timed_out() {
                return *drained >= shared.counters.accepted.load(Ordering::Acquire);
            }
        }
        true
    }

    /// Stop the pipeline. Idempotent.
    ///
    /// The consumer finishes the record it is writing, then exits; anything
    /// still queued is discarded and no further writes are attempted. The
    /// console sink is disposed and the log file closed.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("shutting down log pipeline");

        // Dropping the only sender wakes a consumer parked on an empty queue.
        self.sender.write().take();
        {
            let _drained = self.shared.drained.lock();
            self.shared.drained_cv.notify_all();
        }

        if let Some(handle) = self.consumer.lock().take() {
            if handle.thread().id() == thread::current().id() {
                debug!("shutdown called from the consumer thread; not joining");
            } else if handle.join().is_err() {
                warn!("log consumer thread panicked");
            }
        }

        let mut sinks = self.shared.sinks.lock();
        if let Some(console) = sinks.console.as_ref() {
            console.dispose();
        }
        sinks.file = FileSlot::Closed;
        debug!("log pipeline shut down");
    }
}

impl Drop for LogPipeline {
    fn drop(&mut self) {
        // Signal only; explicit shutdown() joins the consumer.
        if self.shared.running.swap(false, Ordering::AcqRel) {
            self.sender.get_mut().take();
            debug!("LogPipeline dropped without explicit shutdown");
        }
    }
}

impl std::fmt::Debug for LogPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPipeline")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn consume(&self) {
        debug!("log consumer started");
        loop {
            // Wait for readiness without popping, so the pop itself happens
            // under the sink lock together with the write.
            let mut select = Select::new();
            select.recv(&self.receiver);
            select.ready();

            if !self.running.load(Ordering::Acquire) {
                break;
            }

            let mut sinks = self.sinks.lock();
            match self.receiver.try_recv() {
                Ok(record) => self.deliver(&mut sinks, &record),
                // An overflowing producer drained it first.
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }
        }
        debug!("log consumer exiting");
    }

    /// Route one queued record and count it as drained.
    fn deliver(&self, sinks: &mut Sinks, record: &LogRecord) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.route(sinks, record)));
        if let Err(payload) = outcome {
            self.absorb(&CapturedError::from_panic(payload.as_ref()));
        }

        let mut drained = self.drained.lock();
        *drained += 1;
        self.drained_cv.notify_all();
    }

    fn route(&self, sinks: &mut Sinks, record: &LogRecord) {
        let rendered = format::render(record);
        if rendered.template_error.is_some() {
            self.counters.template_failures.fetch_add(1, Ordering::Relaxed);
        }

        if self.console_enabled.load(Ordering::Acquire) {
            if let Some(console) = sinks.console.as_ref() {
                console.append(&rendered.text);
            }
        }
        if self.file_enabled.load(Ordering::Acquire) {
            self.write_file(sinks, &rendered.text);
        }
    }

    /// Overflow path, run on the producer's thread.
    fn write_through(&self, record: LogRecord) -> Delivery {
        let mut sinks = self.sinks.lock();
        if !self.running.load(Ordering::Acquire) {
            return Delivery::Closed;
        }

        while let Ok(queued) = self.receiver.try_recv() {
            self.deliver(&mut sinks, &queued);
        }

        if !self.saturated.swap(true, Ordering::AcqRel) {
            let warning = LogRecord::new(
                Level::Warn,
                "log queue saturated at {} records; writing synchronously from producer threads",
                vec![LogArg::new(self.config.queue_capacity)],
                None,
                self.clock.now(),
            );
            self.write_direct(&mut sinks, &warning);
        }
        self.write_direct(&mut sinks, &record);

        self.counters.fallback_writes.fetch_add(1, Ordering::Relaxed);
        Delivery::Fallback
    }

    /// Write to the file sink, or to stderr when the file sink is unavailable.
    fn write_direct(&self, sinks: &mut Sinks, record: &LogRecord) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let rendered = format::render(record);
            if rendered.template_error.is_some() {
                self.counters.template_failures.fetch_add(1, Ordering::Relaxed);
            }
            let written =
                self.file_enabled.load(Ordering::Acquire) && self.write_file(sinks, &rendered.text);
            if !written {
                eprint!("{}", rendered.text);
            }
        }));
        if let Err(payload) = outcome {
            self.absorb(&CapturedError::from_panic(payload.as_ref()));
        }
    }

    fn write_file(&self, sinks: &mut Sinks, text: &str) -> bool {
        if matches!(sinks.file, FileSlot::Pending) {
            self.open_file(sinks);
        }
        let FileSlot::Open(file) = &mut sinks.file else {
            return false;
        };
        match file.write(text) {
            Ok(()) => true,
            Err(err) => {
                self.absorb(&CapturedError::from_error(&err));
                false
            }
        }
    }

    fn open_file(&self, sinks: &mut Sinks) {
        let opened = RollingFileSink::open(
            &self.config.log_dir,
            self.config.file_prefix.as_str(),
            Arc::clone(&self.clock),
        );
        match opened {
            Ok(file) => sinks.file = FileSlot::Open(file),
            Err(err) => self.disable_file(sinks, &err),
        }
    }

    fn disable_file(&self, sinks: &mut Sinks, err: &SinkError) {
        sinks.file = FileSlot::Failed;
        self.file_enabled.store(false, Ordering::Release);
        let captured = CapturedError::from_error(err);
        self.absorb(&captured);

        // Surface it through whatever sink is left.
        if self.console_enabled.load(Ordering::Acquire) {
            if let Some(console) = sinks.console.as_ref() {
                let record = LogRecord::new(
                    Level::Error,
                    "file logging disabled for this run",
                    Vec::new(),
                    Some(captured),
                    self.clock.now(),
                );
                console.append(&format::render(&record).text);
            }
        }
    }

    /// Report a failure of the logging path itself. It cannot go through the
    /// sinks that just failed, so it goes to stderr.
    fn absorb(&self, error: &CapturedError) {
        self.counters.sink_failures.fetch_add(1, Ordering::Relaxed);
        let mut line = format!("specter log pipeline: {error}");
        for cause in error.chain().skip(1) {
            line.push_str(&format!("; caused by {cause}"));
        }
        eprintln!("{line}");
    }
}
