//! Latest-frame broadcast buffer
//!
//! The producer overwrites a single slot; every consumer holds a cursor with
//! the last version it delivered and waits for the slot to move past it.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<FrameSlot>
//!               ┌─────────────────────────────┐
//!               │ Mutex<{ current, version }> │
//!               │ Notify (wake all)           │
//!               └──────────────┬──────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!   [Producer]           [FrameCursor]         [FrameCursor]
//!   slot.write()         cursor.next()         cursor.next()
//!        │                     │                     │
//!        └──► version += 1 ────► MjpegStream ──────► TCP
//! ```
//!
//! # Latest frame wins
//!
//! Nothing is queued per consumer. A consumer that is slower than the
//! producer skips intermediate frames and always resumes at the newest one.
//! `Frame` wraps `bytes::Bytes`, so handing the same frame to N consumers
//! only bumps a reference count.

pub mod cursor;
pub mod slot;

pub use cursor::FrameCursor;
pub use slot::{Frame, FrameSlot};
