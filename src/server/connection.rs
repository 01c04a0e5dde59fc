//! Per-connection HTTP driver
//!
//! Runs hyper's HTTP/1 server over one accepted socket and dispatches its
//! single request into the axum router. Request head limits (size and read
//! timeout) are enforced by hyper; keep-alive is off, so every connection
//! carries exactly one request.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tower::Service;

use crate::error::Result;
use crate::server::config::{ServerConfig, MIN_REQUEST_HEAD};

/// Identity of the client behind a request
///
/// Inserted into every request's extensions before routing.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub session_id: u64,
    pub peer_addr: SocketAddr,
    streaming: Arc<AtomicBool>,
}

impl ClientInfo {
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether this connection was handed an MJPEG stream
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub(crate) fn mark_streaming(&self) {
        self.streaming.store(true, Ordering::Release);
    }
}

/// A single accepted client connection
pub struct Connection {
    client: ClientInfo,
    config: ServerConfig,
    router: Router,
}

impl Connection {
    pub fn new(session_id: u64, peer_addr: SocketAddr, config: ServerConfig, router: Router) -> Self {
        Self {
            client: ClientInfo::new(session_id, peer_addr),
            config,
            router,
        }
    }

    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    /// Serve the connection until its response is complete
    ///
    /// Streams only complete when writing to the client fails; that failure
    /// is logged here and not returned.
    pub async fn run<I>(self, io: I) -> Result<()>
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Connection {
            client,
            config,
            router,
        } = self;

        let request_client = client.clone();
        let service = service_fn(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(request_client.clone());
            router.clone().call(request)
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(config.request_timeout)
            .max_buf_size(config.max_request_head.max(MIN_REQUEST_HEAD))
            .keep_alive(false);

        match builder.serve_connection(TokioIo::new(io), service).await {
            Ok(()) => Ok(()),
            Err(e) if client.is_streaming() => {
                tracing::warn!(
                    session_id = client.session_id,
                    peer = %client.peer_addr,
                    error = %e,
                    "Removed streaming client"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
