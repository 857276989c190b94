//! An ordered ring of the most recently seen frames.

use std::collections::VecDeque;

use descriptor_model::Frame;

/// Whether the buffer stores the frame handle as given or deep-copies the
/// payload into buffer-owned storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    Reference,
    Copy,
}

/// Remembers the last `capacity` frames, oldest first.
///
/// `capacity == 0` is permitted: the buffer still retains the single most
/// recently pushed frame so `back()` works within the step it was pushed in,
/// but that frame is evicted as soon as the next frame is pushed.
pub struct FrameBuffer<P> {
    frames: VecDeque<Frame<P>>,
    capacity: usize,
    mode: BufferMode,
}

impl<P: Clone> FrameBuffer<P> {
    pub fn new(capacity: usize, mode: BufferMode) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.max(1)),
            capacity,
            mode,
        }
    }

    pub fn push(&mut self, frame: Frame<P>) {
        let stored = match self.mode {
            BufferMode::Reference => frame,
            BufferMode::Copy => Frame::new(frame.timestamp, frame.payload().clone()),
        };
        self.frames.push_back(stored);

        let retain = self.capacity.max(1);
        while self.frames.len() > retain {
            self.frames.pop_front();
        }
        tracing::trace!(target: "descriptor.buffer", size = self.frames.len(), "frame_pushed");
    }

    /// The most recently pushed frame.
    pub fn back(&self) -> Option<&Frame<P>> {
        self.frames.back()
    }

    /// The `index`-th frame, `0` being the oldest currently retained.
    pub fn at(&self, index: usize) -> Option<&Frame<P>> {
        self.frames.get(index)
    }

    pub fn size(&self) -> usize {
        self.frames.len()
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use descriptor_model::Timestamp;

    fn frame(n: u64) -> Frame<u32> {
        Frame::new(Timestamp::new(n, n as i64 * 1_000), n as u32)
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut buffer = FrameBuffer::new(3, BufferMode::Reference);
        for n in 1..=5 {
            buffer.push(frame(n));
        }
        assert_eq!(buffer.size(), 3);
        assert_eq!(buffer.at(0).unwrap().timestamp.frame_number, 3);
        assert_eq!(buffer.back().unwrap().timestamp.frame_number, 5);
    }

    #[test]
    fn size_equals_min_of_pushes_and_capacity() {
        let mut buffer = FrameBuffer::new(4, BufferMode::Reference);
        for n in 1..=2 {
            buffer.push(frame(n));
        }
        assert_eq!(buffer.size(), 2);
    }

    #[test]
    fn zero_capacity_keeps_only_the_latest_push() {
        let mut buffer = FrameBuffer::new(0, BufferMode::Reference);
        buffer.push(frame(1));
        assert_eq!(buffer.back().unwrap().timestamp.frame_number, 1);
        buffer.push(frame(2));
        assert_eq!(buffer.size(), 1);
        assert_eq!(buffer.back().unwrap().timestamp.frame_number, 2);
    }

    #[test]
    fn reset_empties_the_buffer() {
        let mut buffer = FrameBuffer::new(2, BufferMode::Reference);
        buffer.push(frame(1));
        buffer.reset();
        assert_eq!(buffer.size(), 0);
        assert!(buffer.back().is_none());
    }

    #[test]
    fn copy_mode_clones_the_payload() {
        let mut buffer = FrameBuffer::new(2, BufferMode::Copy);
        let original = frame(1);
        buffer.push(original.clone());
        assert_eq!(*buffer.back().unwrap().payload(), 1);
    }
}
