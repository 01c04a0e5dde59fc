//! MJPEG server
//!
//! The listener accepts sockets and gives each one a [`Connection`] task.
//! The connection speaks HTTP/1 through hyper and routes the request with
//! axum; the stream route answers with an [`MjpegStream`] body.

pub mod config;
pub mod connection;
pub mod listener;
pub mod routes;
pub mod stream;

pub use config::ServerConfig;
pub use connection::{ClientInfo, Connection};
pub use listener::MjpegServer;
pub use routes::{router, AppState};
pub use stream::MjpegStream;
