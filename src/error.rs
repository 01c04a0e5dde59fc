//! Error types

use std::fmt;
use std::io;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug)]
pub enum Error {
    /// Socket or file I/O failure
    Io(io::Error),
    /// HTTP connection failed (bad request head, header timeout, reset)
    Http(hyper::Error),
    /// Frame producer failed to start or run
    Producer(String),
    /// Camera control (scaler crop) rejected a request
    Camera(String),
    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Producer(msg) => write!(f, "Frame producer error: {}", msg),
            Error::Camera(msg) => write!(f, "Camera control error: {}", msg),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::Http(e)
    }
}
