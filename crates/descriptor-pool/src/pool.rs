use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use descriptor_model::DescriptorError;

use crate::task::Task;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerStatus {
    Waiting,
    Tasked,
    Running,
    FinishedOk,
    FinishedFail,
}

struct WorkerState {
    status: WorkerStatus,
    queue: VecDeque<Task>,
}

struct WorkerSlot {
    state: Mutex<WorkerState>,
    condvar: Condvar,
}

/// A fixed-size pool of long-lived worker threads.
///
/// Workers are spawned on construction and joined on drop. A batch of tasks
/// is assigned to workers round-robin; `submit` blocks until every worker
/// that received work has finished it, so no task's pointers can outlive the
/// call that created them.
pub struct WorkerPool {
    workers: Vec<Arc<WorkerSlot>>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `thread_count` workers. `thread_count` must be at least 1.
    pub fn new(thread_count: usize) -> Self {
        assert!(thread_count >= 1, "worker pool requires at least one thread");

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(thread_count);
        let mut handles = Vec::with_capacity(thread_count);

        for id in 0..thread_count {
            let slot = Arc::new(WorkerSlot {
                state: Mutex::new(WorkerState {
                    status: WorkerStatus::Waiting,
                    queue: VecDeque::new(),
                }),
                condvar: Condvar::new(),
            });
            let worker_slot = Arc::clone(&slot);
            let worker_shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("descriptor-worker-{id}"))
                .spawn(move || worker_loop(id, worker_slot, worker_shutdown))
                .expect("failed to spawn descriptor worker thread");
            workers.push(slot);
            handles.push(handle);
        }

        tracing::info!(target: "descriptor.pool", thread_count, "worker_pool_started");
        Self {
            workers,
            handles,
            shutdown,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Assigns `tasks` round-robin across workers and blocks until every
    /// worker that received work finishes. Returns `true` iff every worker
    /// reported success.
    pub fn submit(&self, tasks: Vec<Task>) -> bool {
        let worker_count = self.workers.len();
        let mut queues: Vec<VecDeque<Task>> = (0..worker_count).map(|_| VecDeque::new()).collect();
        for (i, task) in tasks.into_iter().enumerate() {
            queues[i % worker_count].push_back(task);
        }

        let task_count: usize = queues.iter().map(VecDeque::len).sum();
        tracing::debug!(target: "descriptor.pool", task_count, worker_count, "batch_dispatched");

        for (slot, queue) in self.workers.iter().zip(queues.into_iter()) {
            let mut state = slot.state.lock().unwrap_or_else(|p| p.into_inner());
            state.queue = queue;
            if state.queue.is_empty() {
                state.status = WorkerStatus::FinishedOk;
            } else {
                state.status = WorkerStatus::Tasked;
                slot.condvar.notify_all();
            }
        }

        let mut batch_ok = true;
        for slot in &self.workers {
            let mut state = slot.state.lock().unwrap_or_else(|p| p.into_inner());
            loop {
                match state.status {
                    WorkerStatus::FinishedOk => break,
                    WorkerStatus::FinishedFail => {
                        batch_ok = false;
                        break;
                    }
                    _ => {
                        let (guard, _timeout) = slot
                            .condvar
                            .wait_timeout(state, WAIT_POLL_INTERVAL)
                            .unwrap_or_else(|p| p.into_inner());
                        state = guard;
                    }
                }
            }
            state.status = WorkerStatus::Waiting;
        }

        if !batch_ok {
            tracing::error!(target: "descriptor.pool", "batch_reported_failure");
        }
        batch_ok
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        for slot in &self.workers {
            let _state = slot.state.lock().unwrap_or_else(|p| p.into_inner());
            slot.condvar.notify_all();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!(target: "descriptor.pool", "worker_thread_panicked_during_join");
            }
        }
        tracing::info!(target: "descriptor.pool", "worker_pool_stopped");
    }
}

fn worker_loop(id: usize, slot: Arc<WorkerSlot>, shutdown: Arc<AtomicBool>) {
    loop {
        let mut state = slot.state.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if shutdown.load(Ordering::Acquire) {
                let err = DescriptorError::TeardownInterrupt;
                tracing::debug!(target: "descriptor.pool", worker = id, error = %err, "worker_terminated");
                return;
            }
            if state.status == WorkerStatus::Tasked {
                break;
            }
            let (guard, _timeout) = slot
                .condvar
                .wait_timeout(state, WAIT_POLL_INTERVAL)
                .unwrap_or_else(|p| p.into_inner());
            state = guard;
        }

        state.status = WorkerStatus::Running;
        let queue = std::mem::take(&mut state.queue);
        drop(state);

        let mut all_ok = true;
        for task in &queue {
            match panic::catch_unwind(AssertUnwindSafe(|| task.execute())) {
                Ok(true) => {}
                Ok(false) => all_ok = false,
                Err(_) => {
                    let err = DescriptorError::WorkerCrash(format!("task execution panicked on worker {id}"));
                    tracing::error!(target: "descriptor.pool", worker = id, error = %err, "worker_task_panicked");
                    all_ok = false;
                }
            }
        }

        let mut state = slot.state.lock().unwrap_or_else(|p| p.into_inner());
        state.status = if all_ok {
            WorkerStatus::FinishedOk
        } else {
            WorkerStatus::FinishedFail
        };
        slot.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descriptor_model::{EmptyScratch, TaskExecutor, Timestamp, Track, TrackId, TrackScratch};
    use std::sync::atomic::AtomicUsize;

    struct StubTrack(TrackId);
    impl Track for StubTrack {
        fn id(&self) -> TrackId {
            self.0
        }
        fn last_timestamp(&self) -> Timestamp {
            Timestamp::new(0, 0)
        }
    }

    struct CountingExecutor {
        updates: AtomicUsize,
    }
    impl TaskExecutor for CountingExecutor {
        fn run_update(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
            self.updates.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn run_terminate(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
            true
        }
    }

    #[test]
    fn pool_runs_every_submitted_task() {
        let pool = WorkerPool::new(2);
        let executor = CountingExecutor {
            updates: AtomicUsize::new(0),
        };
        let track_a = StubTrack(1);
        let track_b = StubTrack(2);
        let mut scratch_a = EmptyScratch;
        let mut scratch_b = EmptyScratch;

        let tasks = vec![
            crate::task::Task::new_update(&track_a, &executor, &mut scratch_a),
            crate::task::Task::new_update(&track_b, &executor, &mut scratch_b),
        ];

        assert!(pool.submit(tasks));
        assert_eq!(executor.updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_task_fails_the_batch() {
        struct AlwaysFails;
        impl TaskExecutor for AlwaysFails {
            fn run_update(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
                false
            }
            fn run_terminate(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
                false
            }
        }

        let pool = WorkerPool::new(1);
        let executor = AlwaysFails;
        let track = StubTrack(1);
        let mut scratch = EmptyScratch;
        let tasks = vec![crate::task::Task::new_update(&track, &executor, &mut scratch)];
        assert!(!pool.submit(tasks));
    }

    #[test]
    fn panicking_task_is_caught_and_pool_keeps_working() {
        struct Panics;
        impl TaskExecutor for Panics {
            fn run_update(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
                panic!("boom");
            }
            fn run_terminate(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
                true
            }
        }

        let pool = WorkerPool::new(1);
        let executor = Panics;
        let track = StubTrack(9);
        let mut scratch = EmptyScratch;
        let tasks = vec![crate::task::Task::new_update(&track, &executor, &mut scratch)];
        assert!(!pool.submit(tasks));

        // the worker loop must still accept a following batch
        let ok_executor = CountingExecutor {
            updates: AtomicUsize::new(0),
        };
        let mut scratch2 = EmptyScratch;
        let more_tasks = vec![crate::task::Task::new_update(&track, &ok_executor, &mut scratch2)];
        assert!(pool.submit(more_tasks));
    }

    #[test]
    fn empty_batch_succeeds_immediately() {
        let pool = WorkerPool::new(3);
        assert!(pool.submit(Vec::new()));
    }
}
