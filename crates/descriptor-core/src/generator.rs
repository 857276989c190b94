use std::collections::HashMap;

use descriptor_buffer::{BufferMode, FrameBuffer};
use descriptor_model::{
    Descriptor, DescriptorError, EmissionBuffer, Frame, GeneratorSettings, TaskExecutor, Track,
    TrackScratch,
};
use descriptor_pool::{Task, WorkerPool};
use descriptor_registry::TrackRegistry;

use crate::hooks::GeneratorHooks;
use crate::validation::finalize_emission;

/// The pieces of a generator a worker thread needs while a batch is
/// in flight: the hook implementation, the frame buffer tasks may read, and
/// the emission sink they append to. Kept as a separate struct so the
/// borrow checker can see it is disjoint from [`Generator`]'s registry field:
/// building a batch needs `&mut registry` and `&core` at once.
pub(crate) struct GeneratorCore<H, P> {
    pub(crate) hooks: H,
    pub(crate) frame_buffer: FrameBuffer<P>,
    pub(crate) emission: EmissionBuffer,
}

impl<H, P> TaskExecutor for GeneratorCore<H, P>
where
    H: GeneratorHooks<P>,
    P: Send + Sync,
{
    fn run_update(&self, track: &dyn Track, scratch: &mut dyn TrackScratch) -> bool {
        self.hooks
            .on_update(track, scratch, &self.frame_buffer, &self.emission)
    }

    fn run_terminate(&self, track: &dyn Track, scratch: &mut dyn TrackScratch) -> bool {
        self.hooks
            .on_terminate(track, scratch, &self.frame_buffer, &self.emission)
    }
}

/// Orchestrates one descriptor implementation: buffers frames, tracks
/// per-track scratch, dispatches per-track work across a worker pool, and
/// validates/tags what the implementation emits.
pub struct Generator<H, P> {
    pub(crate) core: GeneratorCore<H, P>,
    pub(crate) registry: TrackRegistry,
    settings: GeneratorSettings,
    pool: Option<WorkerPool>,
    step_counter: u64,
    modality: String,
}

impl<H, P> Generator<H, P>
where
    H: GeneratorHooks<P>,
    P: Send + Sync + Clone,
{
    pub fn new(hooks: H, settings: GeneratorSettings) -> Self {
        let mode = buffer_mode(&settings);
        let pool = pool_for(&settings);
        tracing::info!(
            target: "descriptor.generator",
            thread_count = settings.thread_count,
            sampling_rate = settings.sampling_rate,
            "generator_created",
        );
        Self {
            core: GeneratorCore {
                hooks,
                frame_buffer: FrameBuffer::new(settings.frame_buffer_length, mode),
                emission: EmissionBuffer::new(),
            },
            registry: TrackRegistry::new(),
            settings,
            pool,
            step_counter: 0,
            modality: String::new(),
        }
    }

    pub fn default_settings() -> GeneratorSettings {
        GeneratorSettings::default()
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Gives the hosting application access to whatever the hook
    /// implementation exposes (counters, accumulated results, etc.).
    pub fn hooks(&self) -> &H {
        &self.core.hooks
    }

    /// Sets the text appended to a descriptor's id when `append_modality`
    /// is enabled.
    pub fn set_modality(&mut self, modality: impl Into<String>) {
        self.modality = modality.into();
    }

    /// Validates and applies `settings`, rebuilding the frame buffer and
    /// worker pool to match, clearing per-track state and the step counter.
    /// Rejected settings leave the generator exactly as it was.
    pub fn configure(&mut self, settings: GeneratorSettings) -> Result<bool, DescriptorError> {
        if settings.thread_count < 1 {
            tracing::warn!(target: "descriptor.generator", "configure_rejected_zero_thread_count");
            return Ok(false);
        }
        if settings.sampling_rate < 1 {
            tracing::warn!(target: "descriptor.generator", "configure_rejected_zero_sampling_rate");
            return Ok(false);
        }

        self.core.frame_buffer = FrameBuffer::new(settings.frame_buffer_length, buffer_mode(&settings));
        self.pool = pool_for(&settings);
        self.registry.clear();
        self.step_counter = 0;
        tracing::info!(
            target: "descriptor.generator",
            thread_count = settings.thread_count,
            sampling_rate = settings.sampling_rate,
            "generator_configured",
        );
        self.settings = settings;
        Ok(true)
    }

    /// Convenience wrapper around [`descriptor_config::from_options`] plus
    /// [`Generator::configure`].
    pub fn configure_from_options(
        &mut self,
        options: &HashMap<String, String>,
    ) -> Result<bool, DescriptorError> {
        let settings = descriptor_config::from_options(options)?;
        self.configure(settings)
    }

    /// Runs one step of the algorithm: pushes `frame`, applies the sampling
    /// gate, runs the frame/per-track/final hooks, validates, and tags
    /// whatever the implementation emitted.
    pub fn step(
        &mut self,
        frame: Frame<P>,
        active_tracks: &[&dyn Track],
        terminated_tracks: &[&dyn Track],
    ) -> Result<bool, DescriptorError> {
        self.core.frame_buffer.push(frame);
        self.core.emission.clear();

        let sampled = self.step_counter % self.settings.sampling_rate == 0;
        self.step_counter += 1;

        if !sampled {
            tracing::trace!(target: "descriptor.generator", "sampling_gate_skipped_step");
            return self.run_terminate_only(terminated_tracks);
        }

        if !self.core.hooks.on_frame(&self.core.frame_buffer, &self.core.emission) {
            let err = DescriptorError::Hook("on_frame returned false".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "on_frame_hook_failed");
            self.core.emission.clear();
            return Ok(false);
        }

        let tasks = self.formulate_tasks(active_tracks, terminated_tracks);
        if !self.dispatch(tasks) {
            let err = DescriptorError::Dispatch("a worker task reported failure".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "task_dispatch_reported_failure");
            self.core.emission.clear();
            return Ok(false);
        }

        if !self.core.hooks.on_final(&self.core.frame_buffer, &self.core.emission) {
            let err = DescriptorError::Hook("on_final returned false".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "on_final_hook_failed");
            self.core.emission.clear();
            return Ok(false);
        }

        if self.settings.process_tracks {
            for track in terminated_tracks.iter().copied() {
                self.registry.erase(track.id());
            }
        }

        self.finalize_step()
    }

    /// Builds the per-track task list for one sampled step. A separate
    /// method so [`crate::MultiGenerator`] can reuse the exact same
    /// construction for each of its children before concatenating the
    /// results into one combined batch.
    pub(crate) fn formulate_tasks(
        &mut self,
        active_tracks: &[&dyn Track],
        terminated_tracks: &[&dyn Track],
    ) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(active_tracks.len() + terminated_tracks.len());
        if !self.settings.process_tracks {
            return tasks;
        }

        for track in terminated_tracks.iter().copied() {
            if let Some(scratch) = self.registry.view_mut(track.id()) {
                tasks.push(Task::new_terminate(track, &self.core, scratch.as_mut()));
            }
        }

        for track in active_tracks.iter().copied() {
            let id = track.id();
            let hooks = &self.core.hooks;
            let scratch = self.registry.ensure(id, || hooks.on_new_track(track));
            tasks.push(Task::new_update(track, &self.core, scratch.as_mut()));
        }

        tasks
    }

    /// Runs `tasks` through the worker pool, or inline on the calling
    /// thread when the pool has a single worker.
    pub(crate) fn dispatch(&self, tasks: Vec<Task>) -> bool {
        if tasks.is_empty() {
            return true;
        }
        if self.settings.thread_count <= 1 {
            let mut ok = true;
            for task in &tasks {
                if !task.execute() {
                    ok = false;
                }
            }
            ok
        } else {
            self.pool
                .as_ref()
                .expect("pool exists whenever thread_count > 1")
                .submit(tasks)
        }
    }

    /// Validates and tags whatever is pending in the emission buffer.
    pub(crate) fn finalize_step(&mut self) -> Result<bool, DescriptorError> {
        if self.settings.run_in_safe_mode || self.settings.append_modality {
            let modality = self.settings.append_modality.then_some(self.modality.as_str());
            if let Err(e) = finalize_emission(&self.core.emission, self.settings.run_in_safe_mode, modality) {
                tracing::error!(target: "descriptor.generator", error = %e, "descriptor_validation_failed");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Terminate tasks are not gated by `sampling_rate`: a track's
    /// termination is a one-time, data-driven event, and skipping it would
    /// leak scratch state for the rest of the stream.
    fn run_terminate_only(&mut self, terminated_tracks: &[&dyn Track]) -> Result<bool, DescriptorError> {
        if !self.settings.process_tracks || terminated_tracks.is_empty() {
            return Ok(true);
        }

        let mut tasks = Vec::with_capacity(terminated_tracks.len());
        for track in terminated_tracks.iter().copied() {
            if let Some(scratch) = self.registry.view_mut(track.id()) {
                tasks.push(Task::new_terminate(track, &self.core, scratch.as_mut()));
            }
        }

        let ok = self.dispatch(tasks);
        for track in terminated_tracks.iter().copied() {
            self.registry.erase(track.id());
        }

        if !ok {
            let err = DescriptorError::Dispatch("terminate task reported failure outside sampling gate".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "terminate_task_failed_outside_sampling_gate");
            self.core.emission.clear();
            return Ok(false);
        }

        self.finalize_step()
    }

    /// Snapshots and empties the emission buffer.
    pub fn get_descriptors(&self) -> Vec<Descriptor> {
        self.core.emission.drain()
    }

    /// Clears the frame buffer and scratch registry, restarts the step
    /// counter, then runs the implementation's `on_reset` hook.
    pub fn reset(&mut self) -> Result<bool, DescriptorError> {
        self.core.frame_buffer.reset();
        self.registry.clear();
        self.core.emission.clear();
        self.step_counter = 0;
        tracing::info!(target: "descriptor.generator", "generator_reset");

        if !self.core.hooks.on_reset() {
            let err = DescriptorError::Hook("on_reset returned false".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "on_reset_hook_failed");
            return Ok(false);
        }
        Ok(true)
    }

    /// Synthesizes a terminate task for every track named in `tracks` that
    /// still has scratch in the registry, runs them, then empties the
    /// registry unconditionally. Intended for end-of-stream teardown, when
    /// upstream has no more terminated-track events to deliver.
    pub fn terminate_all_tracks(&mut self, tracks: &[&dyn Track]) -> Result<bool, DescriptorError> {
        let mut tasks = Vec::with_capacity(tracks.len());
        for track in tracks.iter().copied() {
            if let Some(scratch) = self.registry.view_mut(track.id()) {
                tasks.push(Task::new_terminate(track, &self.core, scratch.as_mut()));
            }
        }

        let ok = self.dispatch(tasks);
        self.registry.clear();

        if !ok {
            let err = DescriptorError::Dispatch("terminate_all_tracks reported failure".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "terminate_all_tracks_failed");
            return Ok(false);
        }
        tracing::info!(target: "descriptor.generator", "all_tracks_terminated");
        Ok(true)
    }
}

pub(crate) fn buffer_mode(settings: &GeneratorSettings) -> BufferMode {
    if settings.buffer_content_copy {
        BufferMode::Copy
    } else {
        BufferMode::Reference
    }
}

pub(crate) fn pool_for(settings: &GeneratorSettings) -> Option<WorkerPool> {
    (settings.thread_count > 1).then(|| WorkerPool::new(settings.thread_count))
}
