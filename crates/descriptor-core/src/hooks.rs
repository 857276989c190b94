use descriptor_buffer::FrameBuffer;
use descriptor_model::{EmissionBuffer, EmptyScratch, Track, TrackScratch};

/// The capability set a concrete descriptor implementation supplies.
///
/// Every method has a no-op default, mirroring how this codebase's other
/// strategy traits (event hooks, plugin hosts) are shaped: implementors
/// override only what they need. `on_new_track` is the one hook most real
/// implementations will want, since without it every track gets the same
/// empty scratch.
pub trait GeneratorHooks<P>: Send + Sync {
    /// Constructs per-track scratch the first time a track is seen.
    fn on_new_track(&self, _track: &dyn Track) -> Box<dyn TrackScratch> {
        Box::new(EmptyScratch)
    }

    /// Runs once per active track on a sampled frame.
    fn on_update(
        &self,
        _track: &dyn Track,
        _scratch: &mut dyn TrackScratch,
        _frames: &FrameBuffer<P>,
        _emit: &EmissionBuffer,
    ) -> bool {
        true
    }

    /// Runs once when a track terminates.
    fn on_terminate(
        &self,
        _track: &dyn Track,
        _scratch: &mut dyn TrackScratch,
        _frames: &FrameBuffer<P>,
        _emit: &EmissionBuffer,
    ) -> bool {
        true
    }

    /// Runs once per sampled frame, before any per-track task is dispatched.
    fn on_frame(&self, _frames: &FrameBuffer<P>, _emit: &EmissionBuffer) -> bool {
        true
    }

    /// Runs once per sampled frame, after every dispatched task completes.
    fn on_final(&self, _frames: &FrameBuffer<P>, _emit: &EmissionBuffer) -> bool {
        true
    }

    /// Runs after the base generator clears its frame buffer and scratch
    /// registry during `reset()`.
    fn on_reset(&self) -> bool {
        true
    }
}

/// Lets a `Box<dyn GeneratorHooks<P>>` stand in for a concrete hook set, so
/// [`crate::MultiGenerator`] can host children whose hook implementations
/// differ in concrete type.
impl<P> GeneratorHooks<P> for Box<dyn GeneratorHooks<P>> {
    fn on_new_track(&self, track: &dyn Track) -> Box<dyn TrackScratch> {
        (**self).on_new_track(track)
    }

    fn on_update(
        &self,
        track: &dyn Track,
        scratch: &mut dyn TrackScratch,
        frames: &FrameBuffer<P>,
        emit: &EmissionBuffer,
    ) -> bool {
        (**self).on_update(track, scratch, frames, emit)
    }

    fn on_terminate(
        &self,
        track: &dyn Track,
        scratch: &mut dyn TrackScratch,
        frames: &FrameBuffer<P>,
        emit: &EmissionBuffer,
    ) -> bool {
        (**self).on_terminate(track, scratch, frames, emit)
    }

    fn on_frame(&self, frames: &FrameBuffer<P>, emit: &EmissionBuffer) -> bool {
        (**self).on_frame(frames, emit)
    }

    fn on_final(&self, frames: &FrameBuffer<P>, emit: &EmissionBuffer) -> bool {
        (**self).on_final(frames, emit)
    }

    fn on_reset(&self) -> bool {
        (**self).on_reset()
    }
}
