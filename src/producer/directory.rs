//! Directory replay producer
//!
//! Loads every JPEG file in a directory (sorted by name) and writes them into
//! the frame slot in a loop at a fixed rate. Stands in for a camera encoder
//! when no hardware is attached.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameSlot};

use super::FrameProducer;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Configuration for a directory producer
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Directory holding `.jpg` / `.jpeg` files
    pub path: PathBuf,
    /// Frames written per second
    pub fps: u32,
}

impl DirectoryConfig {
    pub fn new(path: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            path: path.into(),
            fps,
        }
    }
}

/// Replays a directory of JPEG files as a live stream
pub struct DirectoryProducer {
    config: DirectoryConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<u64>>,
}

impl DirectoryProducer {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Read all JPEG files in `dir`, sorted by file name
    ///
    /// Files whose extension is not `jpg`/`jpeg` are ignored; files that do
    /// not start with a JPEG SOI marker are skipped with a warning.
    pub fn load_frames(dir: &Path) -> Result<Vec<Frame>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_jpeg_name(path))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let data = std::fs::read(&path)?;
            if !data.starts_with(&JPEG_SOI) {
                tracing::warn!(path = %path.display(), "Skipping file without JPEG header");
                continue;
            }
            frames.push(Frame::from(data));
        }

        Ok(frames)
    }
}

fn is_jpeg_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

impl FrameProducer for DirectoryProducer {
    fn start(&mut self, slot: Arc<FrameSlot>) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::Producer("already started".into()));
        }
        if self.config.fps == 0 {
            return Err(Error::Config("fps must be greater than zero".into()));
        }

        let frames = Self::load_frames(&self.config.path)?;
        if frames.is_empty() {
            return Err(Error::Producer(format!(
                "no JPEG files in {}",
                self.config.path.display()
            )));
        }

        let interval = Duration::from_secs(1) / self.config.fps;
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        tracing::info!(
            path = %self.config.path.display(),
            frames = frames.len(),
            fps = self.config.fps,
            "Replaying JPEG directory"
        );

        let worker = std::thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || {
                let mut written = 0u64;
                let mut next_at = Instant::now();

                for frame in frames.iter().cycle() {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    slot.write(frame.clone());
                    written += 1;

                    next_at += interval;
                    let now = Instant::now();
                    if next_at > now {
                        std::thread::sleep(next_at - now);
                    } else {
                        // Fell behind; don't burst to catch up
                        next_at = now;
                    }
                }

                written
            });

        match worker {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(Error::Producer(format!("failed to spawn producer thread: {}", e)))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(written) => tracing::debug!(frames_written = written, "Producer thread exited"),
                Err(_) => tracing::error!("Producer thread panicked"),
            }
        }
    }
}
