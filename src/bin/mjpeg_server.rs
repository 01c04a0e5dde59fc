//! MJPEG streaming server
//!
//! Run with: cargo run --bin mjpeg_server -- --frames-dir ./frames [--bind ADDR]
//!
//! Replays the JPEG files of a directory as a live camera feed. Point a
//! browser at http://<host>:8000/ to watch it; the page's button zooms the
//! (logged) camera crop out one step per click.
//!
//! With curl:
//!   curl -N http://localhost:8000/stream.mjpg | head -c 1000
//!   curl -X POST -i http://localhost:8000/zoom

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use mjpeg_rs::control::{CropRect, LoggingScalerCrop, ZoomConfig, ZoomController};
use mjpeg_rs::producer::{DirectoryConfig, DirectoryProducer, ProducerGuard};
use mjpeg_rs::server::config::DEFAULT_PORT;
use mjpeg_rs::{FrameSlot, MjpegServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "mjpeg_server", version, about = "Serve a JPEG frame source as an MJPEG stream")]
struct Args {
    /// Address to bind to: IP:PORT, IP, or "localhost"
    #[arg(long, env = "MJPEG_BIND", default_value = "0.0.0.0:8000", value_parser = parse_bind_addr)]
    bind: SocketAddr,

    /// Directory of .jpg files replayed as the camera feed
    #[arg(long, env = "MJPEG_FRAMES_DIR")]
    frames_dir: PathBuf,

    /// Frames per second written by the producer
    #[arg(long, env = "MJPEG_FPS", default_value_t = 30)]
    fps: u32,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "MJPEG_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Native sensor width in pixels
    #[arg(long, default_value_t = 4656)]
    native_width: u32,

    /// Native sensor height in pixels
    #[arg(long, default_value_t = 3496)]
    native_height: u32,

    /// Width of the startup crop
    #[arg(long, default_value_t = 3240)]
    crop_width: u32,

    /// Height of the startup crop
    #[arg(long, default_value_t = 2430)]
    crop_height: u32,
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8000
/// - "localhost:8081" -> 127.0.0.1:8081
/// - "127.0.0.1" -> 127.0.0.1:8000
/// - "0.0.0.0:8000" -> 0.0.0.0:8000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_rs=info".parse()?)
                .add_directive("mjpeg_server=info".parse()?),
        )
        .init();

    let zoom_config = ZoomConfig::default()
        .native_size(args.native_width, args.native_height)
        .initial_crop(CropRect::new(0, 0, args.crop_width, args.crop_height));
    let zoom = ZoomController::new(&zoom_config, LoggingScalerCrop::new())?;

    let slot = Arc::new(FrameSlot::new());

    // Stopped on every way out of this function
    let _producer = ProducerGuard::start(
        DirectoryProducer::new(DirectoryConfig::new(&args.frames_dir, args.fps)),
        Arc::clone(&slot),
    )?;

    let config = ServerConfig::with_addr(args.bind).max_connections(args.max_connections);
    let server = MjpegServer::new(config, slot, zoom);

    tracing::info!(
        addr = %server.bind_addr(),
        "Open http://{}/ in a browser",
        server.bind_addr()
    );

    server.run_until(shutdown_signal()).await?;

    let stats = server.stats().snapshot();
    tracing::info!(
        connections = stats.total_connections,
        frames_sent = stats.frames_sent,
        bytes_sent = stats.bytes_sent,
        bitrate = stats.bitrate(),
        zoom_requests = stats.zoom_requests,
        "Server stopped"
    );

    Ok(())
}
