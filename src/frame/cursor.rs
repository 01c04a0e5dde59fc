//! Per-consumer position in the frame sequence

use std::sync::Arc;

use super::slot::{Frame, FrameSlot};

/// A consumer's view of a `FrameSlot`
///
/// Remembers the last version it returned, so `next()` never yields the same
/// version twice and always moves forward in write order.
#[derive(Debug)]
pub struct FrameCursor {
    slot: Arc<FrameSlot>,
    last_seen: u64,
    delivered: u64,
    skipped: u64,
}

impl FrameCursor {
    /// Create a cursor positioned before the first frame
    pub fn new(slot: Arc<FrameSlot>) -> Self {
        Self {
            slot,
            last_seen: 0,
            delivered: 0,
            skipped: 0,
        }
    }

    /// Wait for the next frame after the last one returned
    pub async fn next(&mut self) -> Frame {
        let (frame, version) = self.slot.wait_for_next(self.last_seen).await;

        // Writes before the first delivery happened before this consumer existed
        if self.delivered > 0 {
            self.skipped += version - self.last_seen - 1;
        }
        self.delivered += 1;
        self.last_seen = version;
        frame
    }

    /// Version of the last frame returned (0 before the first)
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Frames returned by `next()` so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Writes that landed between two returned frames and were never seen
    ///
    /// Non-zero once the consumer fell behind the producer.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
