//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Port the stream is served on unless configured otherwise
pub const DEFAULT_PORT: u16 = 8000;

/// Smallest request head limit hyper accepts for its read buffer
pub const MIN_REQUEST_HEAD: usize = 8 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Time allowed for a client to send its request head
    ///
    /// Streaming clients are never timed out once the stream has started.
    pub request_timeout: Duration,

    /// Largest accepted request head in bytes, at least [`MIN_REQUEST_HEAD`]
    ///
    /// Larger heads are answered with 431 by hyper.
    pub max_request_head: usize,

    /// Pending connection queue length passed to listen(2)
    pub listen_backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Parts go out as soon as they are flushed
            request_timeout: Duration::from_secs(10),
            max_request_head: MIN_REQUEST_HEAD,
            listen_backlog: 1024,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set request head timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the request head size limit, raised to [`MIN_REQUEST_HEAD`] if smaller
    pub fn max_request_head(mut self, size: usize) -> Self {
        self.max_request_head = size.max(MIN_REQUEST_HEAD);
        self
    }

    /// Set the listen(2) backlog
    pub fn listen_backlog(mut self, backlog: u32) -> Self {
        self.listen_backlog = backlog;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}
