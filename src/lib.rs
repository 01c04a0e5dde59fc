//! Latest-frame MJPEG broadcaster
//!
//! One producer writes encoded JPEG frames into a [`FrameSlot`]; any number
//! of HTTP clients read them back as a `multipart/x-mixed-replace` stream.
//! Every client starts at the newest frame and then receives each following
//! frame in order. Clients that fall behind skip straight to the newest frame
//! instead of building up a queue, and the producer never waits on clients.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mjpeg_rs::control::{LoggingScalerCrop, ZoomConfig, ZoomController};
//! use mjpeg_rs::producer::{DirectoryConfig, DirectoryProducer, ProducerGuard};
//! use mjpeg_rs::{FrameSlot, MjpegServer, ServerConfig};
//!
//! # async fn example() -> mjpeg_rs::error::Result<()> {
//! let slot = Arc::new(FrameSlot::new());
//! let zoom = ZoomController::new(&ZoomConfig::default(), LoggingScalerCrop::new())?;
//!
//! // Stopped again when `_producer` goes out of scope
//! let _producer = ProducerGuard::start(
//!     DirectoryProducer::new(DirectoryConfig::new("./frames", 15)),
//!     Arc::clone(&slot),
//! )?;
//!
//! let server = MjpegServer::new(ServerConfig::default(), slot, zoom);
//! server.run().await
//! # }
//! ```
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | 301 to `/index.html` |
//! | GET | `/index.html` | landing page |
//! | GET | `/stream.mjpg` | MJPEG stream |
//! | POST | `/zoom` | 204, zooms the camera crop out one step |
//! | any | other | 404 |

pub mod control;
pub mod error;
pub mod frame;
pub mod http;
pub mod producer;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use frame::{Frame, FrameCursor, FrameSlot};
pub use server::{MjpegServer, ServerConfig};
