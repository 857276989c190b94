//! The per-track scratch lifecycle: one allocation per track, handed back on
//! every subsequent hook call, released on termination or reset.

use std::collections::HashMap;

use descriptor_model::{TrackId, TrackScratch};

/// Maps track identity to descriptor-private scratch state.
///
/// Mutated only by the dispatching thread, between worker-pool batches;
/// workers only ever read/write the scratch slot their task was given, never
/// the registry itself.
#[derive(Default)]
pub struct TrackRegistry {
    entries: HashMap<TrackId, Box<dyn TrackScratch>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing scratch for `track_id`, or calls `factory` to
    /// create and insert one. `factory` runs at most once per track.
    pub fn ensure(
        &mut self,
        track_id: TrackId,
        factory: impl FnOnce() -> Box<dyn TrackScratch>,
    ) -> &mut Box<dyn TrackScratch> {
        self.entries.entry(track_id).or_insert_with(|| {
            tracing::debug!(target: "descriptor.registry", track_id, "scratch_created");
            factory()
        })
    }

    /// Drops the scratch entry for `track_id`. A no-op if absent.
    pub fn erase(&mut self, track_id: TrackId) {
        if self.entries.remove(&track_id).is_some() {
            tracing::debug!(target: "descriptor.registry", track_id, "scratch_erased");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn view(&self, track_id: TrackId) -> Option<&dyn TrackScratch> {
        self.entries.get(&track_id).map(|b| b.as_ref())
    }

    pub fn view_mut(&mut self, track_id: TrackId) -> Option<&mut Box<dyn TrackScratch>> {
        self.entries.get_mut(&track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.entries.contains_key(&track_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[test]
    fn ensure_creates_once_and_reuses_afterward() {
        let mut registry = TrackRegistry::new();
        let mut factory_calls = 0;
        {
            let scratch = registry.ensure(7, || Box::new(Counter(0)));
            scratch.as_any_mut().downcast_mut::<Counter>().unwrap().0 = 5;
        }
        factory_calls += 1;
        let scratch = registry.ensure(7, || {
            factory_calls += 1;
            Box::new(Counter(0))
        });
        assert_eq!(scratch.as_any().downcast_ref::<Counter>().unwrap().0, 5);
        assert_eq!(factory_calls, 1);
    }

    #[test]
    fn erase_removes_the_entry() {
        let mut registry = TrackRegistry::new();
        registry.ensure(1, || Box::new(Counter(0)));
        registry.erase(1);
        assert!(!registry.contains(1));
    }

    #[test]
    fn erase_is_idempotent() {
        let mut registry = TrackRegistry::new();
        registry.erase(999);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_drops_every_entry() {
        let mut registry = TrackRegistry::new();
        registry.ensure(1, || Box::new(Counter(0)));
        registry.ensure(2, || Box::new(Counter(0)));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn view_does_not_create() {
        let registry = TrackRegistry::new();
        assert!(registry.view(42).is_none());
    }
}
