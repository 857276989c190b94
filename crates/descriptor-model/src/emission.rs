use std::sync::Mutex;

use crate::descriptor::Descriptor;

/// The per-step pending-descriptor sink.
///
/// Multiple worker threads may append to one generator's buffer concurrently
/// from within `on_update`/`on_terminate`, so appends are serialized behind a
/// lock. The lock is held only for the push itself, never across the
/// descriptor-building work that precedes it.
#[derive(Default)]
pub struct EmissionBuffer {
    pending: Mutex<Vec<Descriptor>>,
}

impl EmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, descriptor: Descriptor) {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(descriptor);
    }

    /// Clears the buffer, discarding anything not yet harvested. Called at
    /// the start of every step and whenever a step fails validation.
    pub fn clear(&self) {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Snapshots and empties the buffer, handing ownership of the pending
    /// descriptors to the caller.
    pub fn drain(&self) -> Vec<Descriptor> {
        std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
