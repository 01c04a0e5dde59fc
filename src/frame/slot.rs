//! Single-slot frame mailbox
//!
//! `FrameSlot` holds the most recently written frame and a version counter.
//! Writers never wait for readers; readers wait for the version to advance.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::Notify;

use super::cursor::FrameCursor;

/// One complete encoded JPEG image
///
/// Cheap to clone: the inner `Bytes` is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Wrap encoded image data
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Encoded image data
    pub fn data(&self) -> &Bytes {
        &self.0
    }

    /// Size of the encoded image in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length frame
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the encoded data out without copying
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<&'static [u8]> for Frame {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Default)]
struct SlotState {
    /// `None` until the first write
    current: Option<Frame>,
    /// Number of writes so far; 0 means nothing was ever written
    version: u64,
}

/// Latest-frame mailbox shared by the producer and all consumers
///
/// The frame and its version live under one mutex so a reader always sees a
/// matching pair. Waiters register with the `Notify` before they check the
/// version, which closes the window between "checked, nothing new" and
/// "started waiting" that a write could otherwise slip through.
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl FrameSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame and wake every waiter
    ///
    /// Only holds the lock for the swap, so it never blocks on consumers.
    /// Returns the version assigned to the frame.
    pub fn write(&self, frame: impl Into<Frame>) -> u64 {
        let frame = frame.into();
        let version = {
            let mut state = self.lock();
            state.version += 1;
            state.current = Some(frame);
            state.version
        };

        self.notify.notify_waiters();

        tracing::trace!(version = version, "Frame written");
        version
    }

    /// Wait until a frame newer than `last_seen` exists and return it
    ///
    /// Resolves immediately if the slot already moved past `last_seen`.
    /// Before the first write this waits; it never yields an absent frame.
    pub async fn wait_for_next(&self, last_seen: u64) -> (Frame, u64) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(newer) = self.newer_than(last_seen) {
                return newer;
            }

            notified.await;
        }
    }

    /// Current frame and version, if any frame has been written
    pub fn latest(&self) -> Option<(Frame, u64)> {
        let state = self.lock();
        state.current.clone().map(|frame| (frame, state.version))
    }

    /// Number of frames written so far
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Create a cursor that starts before the first frame
    ///
    /// Its first `next()` returns whatever frame is current at that time.
    pub fn subscribe(self: &Arc<Self>) -> FrameCursor {
        FrameCursor::new(Arc::clone(self))
    }

    fn newer_than(&self, last_seen: u64) -> Option<(Frame, u64)> {
        let state = self.lock();
        if state.version > last_seen {
            state.current.clone().map(|frame| (frame, state.version))
        } else {
            None
        }
    }

    // A panic while holding the lock cannot leave the pair half-written,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[test]
    fn test_empty_slot() {
        let slot = FrameSlot::new();
        assert_eq!(slot.version(), 0);
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_write_increments_version() {
        let slot = FrameSlot::new();
        assert_eq!(slot.write(&b"AAAAA"[..]), 1);
        assert_eq!(slot.write(&b"BBB"[..]), 2);

        let (frame, version) = slot.latest().unwrap();
        assert_eq!(version, 2);
        assert_eq!(frame.as_ref(), b"BBB");
    }

    #[test]
    fn test_wait_returns_immediately_when_newer() {
        let slot = FrameSlot::new();
        slot.write(&b"AAAAA"[..]);

        let mut waiter = task::spawn(slot.wait_for_next(0));
        let (frame, version) = assert_ready!(waiter.poll());
        assert_eq!(frame.as_ref(), b"AAAAA");
        assert_eq!(version, 1);
    }

    #[test]
    fn test_wait_blocks_before_first_write() {
        let slot = FrameSlot::new();

        let mut waiter = task::spawn(slot.wait_for_next(0));
        assert_pending!(waiter.poll());
        assert_pending!(waiter.poll());

        slot.write(&b"first"[..]);
        assert!(waiter.is_woken());

        let (frame, version) = assert_ready!(waiter.poll());
        assert_eq!(frame.as_ref(), b"first");
        assert_eq!(version, 1);
    }

    #[test]
    fn test_wait_ignores_already_seen_version() {
        let slot = FrameSlot::new();
        slot.write(&b"seen"[..]);

        let mut waiter = task::spawn(slot.wait_for_next(1));
        assert_pending!(waiter.poll());

        slot.write(&b"fresh"[..]);
        assert!(waiter.is_woken());
        let (frame, version) = assert_ready!(waiter.poll());
        assert_eq!(frame.as_ref(), b"fresh");
        assert_eq!(version, 2);
    }

    #[test]
    fn test_stalled_waiter_gets_latest() {
        let slot = FrameSlot::new();

        let mut waiter = task::spawn(slot.wait_for_next(0));
        assert_pending!(waiter.poll());

        // Two writes land before the waiter runs again
        slot.write(&b"W1"[..]);
        slot.write(&b"W2"[..]);

        let (frame, version) = assert_ready!(waiter.poll());
        assert_eq!(frame.as_ref(), b"W2");
        assert_eq!(version, 2);
    }

    #[test]
    fn test_all_waiters_woken() {
        let slot = FrameSlot::new();

        let mut a = task::spawn(slot.wait_for_next(0));
        let mut b = task::spawn(slot.wait_for_next(0));
        assert_pending!(a.poll());
        assert_pending!(b.poll());

        slot.write(&b"shared"[..]);
        assert!(a.is_woken());
        assert!(b.is_woken());

        let (fa, va) = assert_ready!(a.poll());
        let (fb, vb) = assert_ready!(b.poll());
        assert_eq!(fa, fb);
        assert_eq!(va, vb);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_writer_thread_never_loses_wakeup() {
        const WRITES: u64 = 2_000;

        let slot = Arc::new(FrameSlot::new());
        let reader_slot = Arc::clone(&slot);

        let reader = tokio::spawn(async move {
            let mut last_seen = 0;
            while last_seen < WRITES {
                let (_, version) = reader_slot.wait_for_next(last_seen).await;
                assert!(version > last_seen);
                last_seen = version;
            }
            last_seen
        });

        let writer_slot = Arc::clone(&slot);
        let writer = std::thread::spawn(move || {
            for i in 0..WRITES {
                writer_slot.write(i.to_be_bytes().to_vec());
            }
        });
        writer.join().unwrap();

        // A lost wakeup would leave the reader parked on a stale version forever
        let last = tokio::time::timeout(Duration::from_secs(10), reader)
            .await
            .expect("reader missed the final write")
            .unwrap();
        assert_eq!(last, WRITES);
    }
}
