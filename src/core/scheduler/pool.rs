//! Worker pool backed by a delay queue.
//!
//! Workers block on a `parking_lot` Condvar until the earliest entry is due,
//! so an idle pool burns no CPU. A repeating task is pushed back only after
//! its run returns, which is what keeps it from overlapping itself.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use super::{Cadence, Registry, TaskState};
use crate::core::error::SchedulerError;

struct Entry {
    due: Instant,
    seq: u64,
    task: Arc<TaskState>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Earliest due first, FIFO among equal due times (reversed for max-heap).
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    Running,
    /// No new work; queued one-off tasks still run, then workers exit.
    ShuttingDown,
    /// Replaced by a resize; workers exit after their current run.
    Stopped,
}

struct DelayQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
    state: PoolState,
}

/// One generation of worker threads.
pub(crate) struct WorkerPool {
    worker_count: usize,
    queue: Mutex<DelayQueue>,
    available: Condvar,
    live_workers: Mutex<usize>,
    exited: Condvar,
    registry: Arc<Registry>,
}

impl WorkerPool {
    /// Spawn `worker_count` named worker threads.
    pub(crate) fn start(
        worker_count: usize,
        registry: Arc<Registry>,
    ) -> Result<Arc<Self>, SchedulerError> {
        let pool = Arc::new(Self {
            worker_count,
            queue: Mutex::new(DelayQueue {
                heap: BinaryHeap::new(),
                seq: 0,
                state: PoolState::Running,
            }),
            available: Condvar::new(),
            live_workers: Mutex::new(0),
            exited: Condvar::new(),
            registry,
        });

        for _ in 0..worker_count {
            let name = pool.registry.next_thread_name();
            let worker = Arc::clone(&pool);
            *pool.live_workers.lock() += 1;
            let spawned = thread::Builder::new()
                .name(name)
                .spawn(move || worker.work());
            if let Err(err) = spawned {
                *pool.live_workers.lock() -= 1;
                pool.stop();
                return Err(SchedulerError::Spawn(err));
            }
        }

        debug!(worker_count, "scheduler pool started");
        Ok(pool)
    }

    pub(crate) const fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.lock().heap.len()
    }

    /// Queue a task to become due at `due`.
    pub(crate) fn push(&self, task: Arc<TaskState>, due: Instant) -> Result<(), SchedulerError> {
        let mut queue = self.queue.lock();
        if queue.state != PoolState::Running {
            return Err(SchedulerError::Shutdown);
        }
        queue.seq += 1;
        let seq = queue.seq;
        queue.heap.push(Entry { due, seq, task });
        self.available.notify_one();
        Ok(())
    }

    /// Stop accepting work. Queued repeating tasks are removed and returned;
    /// queued one-off tasks still run.
    pub(crate) fn shutdown(&self) -> Vec<Arc<TaskState>> {
        let mut queue = self.queue.lock();
        if queue.state != PoolState::Running {
            return Vec::new();
        }
        queue.state = PoolState::ShuttingDown;

        let (keep, dropped): (Vec<Entry>, Vec<Entry>) = queue
            .heap
            .drain()
            .partition(|entry| !entry.task.cadence().is_repeating());
        queue.heap.extend(keep);
        self.available.notify_all();
        dropped.into_iter().map(|entry| entry.task).collect()
    }

    /// Stop immediately, returning every task that had not started.
    pub(crate) fn stop(&self) -> Vec<Arc<TaskState>> {
        let mut queue = self.queue.lock();
        queue.state = PoolState::Stopped;
        let abandoned = queue.heap.drain().map(|entry| entry.task).collect();
        self.available.notify_all();
        abandoned
    }

    /// Wait until every worker thread has exited.
    pub(crate) fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut live = self.live_workers.lock();
        while *live > 0 {
            if self.exited.wait_until(&mut live, deadline).timed_out() {
                return *live == 0;
            }
        }
        true
    }

    fn work(&self) {
        let _exit = ExitGuard(self);
        debug!(worker = thread::current().name().unwrap_or("?"), "scheduler worker started");
        while let Some(entry) = self.next_due() {
            self.run(entry);
        }
        debug!(worker = thread::current().name().unwrap_or("?"), "scheduler worker exiting");
    }

    fn next_due(&self) -> Option<Entry> {
        let mut queue = self.queue.lock();
        loop {
            if queue.state == PoolState::Stopped {
                return None;
            }
            match queue.heap.peek().map(|entry| entry.due) {
                None if queue.state == PoolState::ShuttingDown => return None,
                None => self.available.wait(&mut queue),
                Some(due) if due <= Instant::now() => {
                    let entry = queue.heap.pop();
                    if !queue.heap.is_empty() {
                        // Let another worker look at the new head.
                        self.available.notify_one();
                    }
                    return entry;
                }
                Some(due) => {
                    let _ = self.available.wait_until(&mut queue, due);
                }
            }
        }
    }

    fn run(&self, entry: Entry) {
        let Entry { due, task, .. } = entry;
        if task.is_cancelled() {
            self.registry.finish(&task);
            return;
        }

        let outcome = task.invoke();
        self.registry.record_run(&task, outcome);

        let next = match task.cadence() {
            Cadence::Once => return self.registry.finish(&task),
            // Behind schedule means due immediately; runs never overlap
            // because the entry is only re-queued here.
            Cadence::FixedRate(period) => due.checked_add(period),
            Cadence::FixedDelay(delay) => Instant::now().checked_add(delay),
        };

        let requeued = match next {
            _ if task.is_cancelled() => false,
            Some(next_due) => self.push(Arc::clone(&task), next_due).is_ok(),
            None => {
                self.registry.record_unschedulable(&task);
                false
            }
        };
        if !requeued {
            self.registry.finish(&task);
        }
    }
}

struct ExitGuard<'a>(&'a WorkerPool);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let mut live = self.0.live_workers.lock();
        *live = live.saturating_sub(1);
        self.0.exited.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;

    fn entry(due: Instant, seq: u64) -> Entry {
        let task = Arc::new(TaskState::new(seq, format!("#{seq}"), Cadence::Once, Box::new(|| -> AppResult<()> { Ok(()) })));
        Entry { due, seq, task }
    }

    #[test]
    fn heap_pops_earliest_then_fifo() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(entry(base + Duration::from_millis(50), 1));
        heap.push(entry(base + Duration::from_millis(10), 2));
        heap.push(entry(base + Duration::from_millis(10), 3));
        heap.push(entry(base, 4));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![4, 2, 3, 1]);
    }
}
