use descriptor_model::{Descriptor, DescriptorError, Frame, GeneratorSettings, Track};
use descriptor_pool::{Task, WorkerPool};

use crate::generator::{pool_for, Generator};
use crate::hooks::GeneratorHooks;

/// Hosts an ordered set of inner generators that share one worker-pool
/// dispatch per step instead of each running its own.
///
/// Each child keeps its own frame buffer, scratch registry, and emission
/// buffer; only the worker-pool dispatch, the expensive part, a
/// condition-variable handshake round-trip, is shared, which is where the
/// "amortizes per-frame setup" saving actually comes from. Children are
/// therefore always constructed with an effective `thread_count` of 1 so
/// they never spin up worker threads of their own.
pub struct MultiGenerator<P> {
    children: Vec<Generator<Box<dyn GeneratorHooks<P>>, P>>,
    settings: GeneratorSettings,
    pool: Option<WorkerPool>,
    step_counter: u64,
}

impl<P> MultiGenerator<P>
where
    P: Send + Sync + Clone,
{
    pub fn new(settings: GeneratorSettings) -> Self {
        let pool = pool_for(&settings);
        Self {
            children: Vec::new(),
            settings,
            pool,
            step_counter: 0,
        }
    }

    /// Adds a child. Children must all be added before the first `step()`;
    /// the set is frozen thereafter by convention (not enforced). `modality`
    /// is the suffix this child's descriptors get tagged with when the
    /// composite's `append_modality` setting is on.
    pub fn add_child(&mut self, hooks: Box<dyn GeneratorHooks<P>>, modality: impl Into<String>) {
        let mut child_settings = self.settings.clone();
        child_settings.thread_count = 1;
        let mut child = Generator::new(hooks, child_settings);
        child.set_modality(modality);
        self.children.push(child);
        tracing::info!(target: "descriptor.generator", child_count = self.children.len(), "multi_generator_child_added");
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn configure(&mut self, settings: GeneratorSettings) -> Result<bool, DescriptorError> {
        if settings.thread_count < 1 {
            tracing::warn!(target: "descriptor.generator", "multi_configure_rejected_zero_thread_count");
            return Ok(false);
        }
        if settings.sampling_rate < 1 {
            tracing::warn!(target: "descriptor.generator", "multi_configure_rejected_zero_sampling_rate");
            return Ok(false);
        }

        let mut child_settings = settings.clone();
        child_settings.thread_count = 1;
        for child in &mut self.children {
            child.configure(child_settings.clone())?;
        }

        self.pool = pool_for(&settings);
        self.step_counter = 0;
        self.settings = settings;
        Ok(true)
    }

    pub fn step(
        &mut self,
        frame: Frame<P>,
        active_tracks: &[&dyn Track],
        terminated_tracks: &[&dyn Track],
    ) -> Result<bool, DescriptorError> {
        for child in &mut self.children {
            child.core.frame_buffer.push(frame.clone());
            child.core.emission.clear();
        }

        let sampled = self.step_counter % self.settings.sampling_rate == 0;
        self.step_counter += 1;

        if !sampled {
            tracing::trace!(target: "descriptor.generator", "multi_sampling_gate_skipped_step");
            return self.run_terminate_only(terminated_tracks);
        }

        for child in &self.children {
            if !child.core.hooks.on_frame(&child.core.frame_buffer, &child.core.emission) {
                let err = DescriptorError::Hook("child on_frame returned false".to_string());
                tracing::error!(target: "descriptor.generator", error = %err, "multi_on_frame_hook_failed");
                self.discard_pending();
                return Ok(false);
            }
        }

        let mut combined_tasks = Vec::new();
        for child in &mut self.children {
            combined_tasks.extend(child.formulate_tasks(active_tracks, terminated_tracks));
        }

        if !dispatch_combined(&self.pool, self.settings.thread_count, combined_tasks) {
            let err = DescriptorError::Dispatch("a worker task reported failure".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "multi_task_dispatch_failed");
            self.discard_pending();
            return Ok(false);
        }

        for child in &self.children {
            if !child.core.hooks.on_final(&child.core.frame_buffer, &child.core.emission) {
                let err = DescriptorError::Hook("child on_final returned false".to_string());
                tracing::error!(target: "descriptor.generator", error = %err, "multi_on_final_hook_failed");
                self.discard_pending();
                return Ok(false);
            }
        }

        if self.settings.process_tracks {
            for child in &mut self.children {
                for track in terminated_tracks.iter().copied() {
                    child.registry.erase(track.id());
                }
            }
        }

        for child in &mut self.children {
            if !child.finalize_step()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn run_terminate_only(&mut self, terminated_tracks: &[&dyn Track]) -> Result<bool, DescriptorError> {
        if !self.settings.process_tracks || terminated_tracks.is_empty() {
            return Ok(true);
        }

        let mut combined_tasks = Vec::new();
        for child in &mut self.children {
            for track in terminated_tracks.iter().copied() {
                if let Some(scratch) = child.registry.view_mut(track.id()) {
                    combined_tasks.push(Task::new_terminate(track, &child.core, scratch.as_mut()));
                }
            }
        }

        let ok = dispatch_combined(&self.pool, self.settings.thread_count, combined_tasks);
        for child in &mut self.children {
            for track in terminated_tracks.iter().copied() {
                child.registry.erase(track.id());
            }
        }

        if !ok {
            let err = DescriptorError::Dispatch("terminate task reported failure outside sampling gate".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "multi_terminate_failed_outside_sampling_gate");
            self.discard_pending();
            return Ok(false);
        }

        for child in &mut self.children {
            if !child.finalize_step()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn terminate_all_tracks(&mut self, tracks: &[&dyn Track]) -> Result<bool, DescriptorError> {
        let mut combined_tasks = Vec::new();
        for child in &mut self.children {
            for track in tracks.iter().copied() {
                if let Some(scratch) = child.registry.view_mut(track.id()) {
                    combined_tasks.push(Task::new_terminate(track, &child.core, scratch.as_mut()));
                }
            }
        }

        let ok = dispatch_combined(&self.pool, self.settings.thread_count, combined_tasks);
        for child in &mut self.children {
            child.registry.clear();
        }

        if !ok {
            let err = DescriptorError::Dispatch("terminate_all_tracks reported failure".to_string());
            tracing::error!(target: "descriptor.generator", error = %err, "multi_terminate_all_tracks_failed");
            return Ok(false);
        }
        tracing::info!(target: "descriptor.generator", "multi_all_tracks_terminated");
        Ok(true)
    }

    pub fn reset(&mut self) -> Result<bool, DescriptorError> {
        self.step_counter = 0;
        let mut ok = true;
        for child in &mut self.children {
            if !child.reset()? {
                ok = false;
            }
        }
        tracing::info!(target: "descriptor.generator", "multi_generator_reset");
        Ok(ok)
    }

    /// Collects the union of every child's pending descriptors.
    pub fn get_descriptors(&self) -> Vec<Descriptor> {
        self.children.iter().flat_map(Generator::get_descriptors).collect()
    }

    fn discard_pending(&self) {
        for child in &self.children {
            child.get_descriptors();
        }
    }
}

fn dispatch_combined(pool: &Option<WorkerPool>, thread_count: usize, tasks: Vec<Task>) -> bool {
    if tasks.is_empty() {
        return true;
    }
    if thread_count <= 1 {
        tasks.iter().fold(true, |ok, task| task.execute() && ok)
    } else {
        pool.as_ref()
            .expect("shared pool exists whenever thread_count > 1")
            .submit(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descriptor_model::{EmissionBuffer, EmptyScratch, Timestamp, TrackScratch};

    struct IdTrack(u64, Timestamp);
    impl Track for IdTrack {
        fn id(&self) -> descriptor_model::TrackId {
            self.0
        }
        fn last_timestamp(&self) -> Timestamp {
            self.1
        }
    }

    struct TaggingHooks(&'static str);
    impl GeneratorHooks<u8> for TaggingHooks {
        fn on_new_track(&self, _track: &dyn Track) -> Box<dyn TrackScratch> {
            Box::new(EmptyScratch)
        }
        fn on_update(
            &self,
            track: &dyn Track,
            _scratch: &mut dyn TrackScratch,
            _frames: &descriptor_buffer::FrameBuffer<u8>,
            emit: &EmissionBuffer,
        ) -> bool {
            emit.push(Descriptor {
                id: format!("{}_{}", self.0, track.id()),
                start: Timestamp::new(1, 0),
                end: Timestamp::new(1, 0),
                history: vec![Timestamp::new(1, 0)],
                features: vec![],
            });
            true
        }
    }

    fn frame() -> Frame<u8> {
        Frame::new(Timestamp::new(1, 0), 0)
    }

    #[test]
    fn each_child_emits_independently_from_one_shared_dispatch() {
        let mut multi = MultiGenerator::new(GeneratorSettings::default());
        multi.add_child(Box::new(TaggingHooks("a")), "a_mod");
        multi.add_child(Box::new(TaggingHooks("b")), "b_mod");

        let track = IdTrack(1, Timestamp::new(1, 0));
        let active: &[&dyn Track] = &[&track];
        let none: &[&dyn Track] = &[];

        assert!(multi.step(frame(), active, none).unwrap());
        let mut ids: Vec<String> = multi.get_descriptors().into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a_1".to_string(), "b_1".to_string()]);
    }

    #[test]
    fn reset_propagates_to_every_child() {
        let mut multi = MultiGenerator::new(GeneratorSettings::default());
        multi.add_child(Box::new(TaggingHooks("a")), "a_mod");
        let track = IdTrack(5, Timestamp::new(1, 0));
        let active: &[&dyn Track] = &[&track];
        let none: &[&dyn Track] = &[];
        multi.step(frame(), active, none).unwrap();

        assert!(multi.reset().unwrap());
        assert_eq!(multi.get_descriptors().len(), 0);
    }

    #[test]
    fn each_child_is_tagged_with_its_own_modality() {
        let settings = GeneratorSettings {
            append_modality: true,
            ..GeneratorSettings::default()
        };
        let mut multi = MultiGenerator::new(settings);
        multi.add_child(Box::new(TaggingHooks("a")), "rgb");
        multi.add_child(Box::new(TaggingHooks("b")), "ir");

        let track = IdTrack(1, Timestamp::new(1, 0));
        let active: &[&dyn Track] = &[&track];
        let none: &[&dyn Track] = &[];

        assert!(multi.step(frame(), active, none).unwrap());
        let mut ids: Vec<String> = multi.get_descriptors().into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a_1_rgb".to_string(), "b_1_ir".to_string()]);
    }
}
