use descriptor_model::{TaskExecutor, Track, TrackScratch};

/// What a task does once dispatched to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Update,
    Terminate,
}

/// A non-owning handle to one unit of per-track work.
///
/// `Task` carries raw pointers rather than borrows because the dispatching
/// worker pool is a *persistent* set of threads: a task submitted to it
/// cannot carry a lifetime tied to one step's stack frame. The dispatcher
/// constructs tasks immediately before `WorkerPool::submit` and that call
/// blocks until every task has finished executing, which is the invariant
/// that makes the pointers valid for the task's entire lifetime. Tasks never
/// outlive the `submit` call that consumes them.
#[derive(Clone, Copy)]
pub struct Task {
    action: TaskAction,
    track: *const dyn Track,
    executor: *const dyn TaskExecutor,
    scratch: *mut dyn TrackScratch,
}

// SAFETY: Task is sent to a worker thread but never aliased: the dispatcher
// guarantees each scratch pointer is assigned to exactly one task per batch,
// and the referenced track/executor/scratch all outlive the batch because
// `WorkerPool::submit` does not return until every worker has finished.
unsafe impl Send for Task {}

impl Task {
    pub fn new_update(
        track: &dyn Track,
        executor: &dyn TaskExecutor,
        scratch: &mut dyn TrackScratch,
    ) -> Self {
        Self {
            action: TaskAction::Update,
            track: track as *const dyn Track,
            executor: executor as *const dyn TaskExecutor,
            scratch: scratch as *mut dyn TrackScratch,
        }
    }

    pub fn new_terminate(
        track: &dyn Track,
        executor: &dyn TaskExecutor,
        scratch: &mut dyn TrackScratch,
    ) -> Self {
        Self {
            action: TaskAction::Terminate,
            track: track as *const dyn Track,
            executor: executor as *const dyn TaskExecutor,
            scratch: scratch as *mut dyn TrackScratch,
        }
    }

    pub fn action(&self) -> TaskAction {
        self.action
    }

    /// Runs the hook this task names. Returns the hook's success flag.
    pub fn execute(&self) -> bool {
        // SAFETY: see the struct-level safety comment. The caller that built
        // this batch guarantees all three pointers are still valid and
        // exclusively owned by this task for the duration of this call.
        unsafe {
            let track = &*self.track;
            let executor = &*self.executor;
            let scratch = &mut *self.scratch;
            match self.action {
                TaskAction::Update => executor.run_update(track, scratch),
                TaskAction::Terminate => executor.run_terminate(track, scratch),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descriptor_model::{EmptyScratch, Timestamp};

    struct StubTrack(u64);
    impl Track for StubTrack {
        fn id(&self) -> descriptor_model::TrackId {
            self.0
        }
        fn last_timestamp(&self) -> Timestamp {
            Timestamp::new(0, 0)
        }
    }

    struct RecordingExecutor;
    impl TaskExecutor for RecordingExecutor {
        fn run_update(&self, track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
            track.id() == 42
        }
        fn run_terminate(&self, _track: &dyn Track, _scratch: &mut dyn TrackScratch) -> bool {
            true
        }
    }

    #[test]
    fn update_task_dispatches_to_run_update() {
        let track = StubTrack(42);
        let executor = RecordingExecutor;
        let mut scratch = EmptyScratch;
        let task = Task::new_update(&track, &executor, &mut scratch);
        assert_eq!(task.action(), TaskAction::Update);
        assert!(task.execute());
    }

    #[test]
    fn terminate_task_dispatches_to_run_terminate() {
        let track = StubTrack(1);
        let executor = RecordingExecutor;
        let mut scratch = EmptyScratch;
        let task = Task::new_terminate(&track, &executor, &mut scratch);
        assert_eq!(task.action(), TaskAction::Terminate);
        assert!(task.execute());
    }
}
