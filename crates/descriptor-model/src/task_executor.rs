use crate::scratch::TrackScratch;
use crate::track::Track;

/// The capability a worker-pool task needs from its owning generator.
///
/// `descriptor-pool`'s `Task` holds a non-owning pointer to a `TaskExecutor`
/// rather than to a concrete generator type, so the task model and worker
/// pool crate never need to depend on `descriptor-core`. `descriptor-core`'s
/// `Generator` is the sole implementor.
pub trait TaskExecutor: Send + Sync {
    /// Runs the `on_update` hook for one active track.
    fn run_update(&self, track: &dyn Track, scratch: &mut dyn TrackScratch) -> bool;

    /// Runs the `on_terminate` hook for one terminated track.
    fn run_terminate(&self, track: &dyn Track, scratch: &mut dyn TrackScratch) -> bool;
}
