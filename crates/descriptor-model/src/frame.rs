use std::sync::Arc;

use crate::timestamp::Timestamp;

/// An opaque, reference-counted frame payload plus its timestamp.
///
/// `Frame` is cheap to clone (an `Arc` bump); the core never inspects or
/// mutates the payload `P`, only passes it through to whatever consumes the
/// frame buffer's contents.
#[derive(Debug, Clone)]
pub struct Frame<P> {
    pub timestamp: Timestamp,
    payload: Arc<P>,
}

impl<P> Frame<P> {
    pub fn new(timestamp: Timestamp, payload: P) -> Self {
        Self {
            timestamp,
            payload: Arc::new(payload),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}
