//! HTTP error types.

use thiserror::Error;

/// Errors surfaced by the HTTP codec, client and server.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed start line, header, or chunk header.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The peer closed the connection before a complete message arrived.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    #[error("request timed out")]
    Timeout,
}
