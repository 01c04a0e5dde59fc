//! TCP front end of the MJPEG server
//!
//! Accepts clients and hands each one to its own [`Connection`] task, which
//! serves it with the router built once at startup.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::Router;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Semaphore;

use crate::control::ZoomControl;
use crate::error::Result;
use crate::frame::FrameSlot;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::routes::{router, AppState};
use crate::stats::ServerStats;

/// MJPEG server
///
/// Owns the shared state every connection needs: the frame slot the
/// producer writes into, the zoom control and the counters.
pub struct MjpegServer<Z: ZoomControl> {
    config: ServerConfig,
    slot: Arc<FrameSlot>,
    zoom: Arc<Z>,
    stats: Arc<ServerStats>,
    router: Router,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<Z: ZoomControl> MjpegServer<Z> {
    /// Create a new server streaming from `slot`
    pub fn new(config: ServerConfig, slot: Arc<FrameSlot>, zoom: Z) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let zoom = Arc::new(zoom);
        let stats = Arc::new(ServerStats::new());
        let router = router(AppState::new(
            Arc::clone(&slot),
            Arc::clone(&zoom),
            Arc::clone(&stats),
        ));

        Self {
            config,
            slot,
            zoom,
            stats,
            router,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Frame slot consumed by streaming clients
    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.slot
    }

    pub fn zoom(&self) -> &Arc<Z> {
        &self.zoom
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Bind the configured address with `SO_REUSEADDR`
    ///
    /// Lets a restarted server reclaim the port while old connections linger
    /// in TIME_WAIT. Must be called from within a Tokio runtime.
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(self.config.listen_backlog)?)
    }

    /// Bind and serve forever
    ///
    /// Only returns if binding fails.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Bind and serve until `shutdown` completes
    ///
    /// Stops accepting at that point. Streams already running are left to
    /// the runtime.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind()?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Stopped accepting clients");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "MJPEG server listening");

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Held by the connection task until the client goes away
        let permit = match &self.connection_semaphore {
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Client rejected, connection limit reached");
                    return;
                }
            },
            None => None,
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.stats.connection_accepted();

        tracing::debug!(session_id, peer = %peer_addr, "Client connected");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(session_id, error = %e, "Socket setup failed");
            return;
        }

        let connection = Connection::new(
            session_id,
            peer_addr,
            self.config.clone(),
            self.router.clone(),
        );

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = connection.run(socket).await {
                tracing::debug!(session_id, error = %e, "Client dropped");
            }

            tracing::debug!(session_id, "Client disconnected");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    /// Address from the configuration; port 0 is not resolved here
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
