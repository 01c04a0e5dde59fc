//! Counters for connections and streamed frames

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Server-wide counters, shared by all connection tasks
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_streams: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    zoom_requests: AtomicU64,
    not_found: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_streams: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            zoom_requests: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
        }
    }

    pub(crate) fn connection_accepted(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stream_started(&self) {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stream_ended(&self) {
        self.active_streams.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn zoom_requested(&self) {
        self.zoom_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn route_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Current number of open MJPEG streams
    pub fn active_streams(&self) -> u64 {
        self.active_streams.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            zoom_requests: self.zoom_requests.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `ServerStats` at one instant
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    /// Connections accepted since start
    pub total_connections: u64,
    /// Currently open MJPEG streams
    pub active_streams: u64,
    /// Multipart parts handed to client connections
    pub frames_sent: u64,
    /// Bytes of those parts (part headers included)
    pub bytes_sent: u64,
    pub zoom_requests: u64,
    pub not_found: u64,
}

impl StatsSnapshot {
    /// Average outgoing stream bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }
}

/// Statistics for one streaming client
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub started_at: Instant,
    /// Parts produced for this client
    pub frames_sent: u64,
    /// Bytes of those parts
    pub bytes_sent: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    pub fn on_frame(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Delivered frames per second over the life of the stream
    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_sent as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}
