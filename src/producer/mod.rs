//! Frame producers
//!
//! A producer owns the capture/encode pipeline and pushes every encoded
//! frame into a `FrameSlot` from its own thread. The server never calls
//! back into it; the only coupling is `FrameSlot::write`.
//!
//! `ProducerGuard` ties the producer's lifetime to a scope: it is started
//! when the guard is created and stopped when the guard is dropped, on the
//! normal path and on early returns alike.

pub mod directory;

use std::sync::Arc;

use crate::error::Result;
use crate::frame::FrameSlot;

pub use directory::{DirectoryConfig, DirectoryProducer};

/// Source of encoded frames
pub trait FrameProducer: Send {
    /// Start producing frames into `slot`
    ///
    /// Frames are written from the producer's own thread, one at a time.
    fn start(&mut self, slot: Arc<FrameSlot>) -> Result<()>;

    /// Stop producing and release the pipeline
    ///
    /// Must be safe to call when already stopped.
    fn stop(&mut self);
}

/// Keeps a producer running for as long as the guard lives
pub struct ProducerGuard<P: FrameProducer> {
    producer: P,
}

impl<P: FrameProducer> ProducerGuard<P> {
    /// Start `producer`; on failure it is stopped before the error is returned
    pub fn start(mut producer: P, slot: Arc<FrameSlot>) -> Result<Self> {
        if let Err(e) = producer.start(slot) {
            producer.stop();
            return Err(e);
        }
        tracing::info!("Frame producer started");
        Ok(Self { producer })
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }
}

impl<P: FrameProducer> Drop for ProducerGuard<P> {
    fn drop(&mut self) {
        self.producer.stop();
        tracing::info!("Frame producer stopped");
    }
}
