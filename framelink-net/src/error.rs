//! Transport error types.

use thiserror::Error;

/// Errors surfaced by the stream and datagram transports.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] framelink_wire::WireError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Operation on a connection or endpoint that has been closed.
    #[error("already closed")]
    Closed,

    /// A frame header announced a length past the configured ceiling.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The peer closed the connection before the operation completed.
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("connect timed out")]
    Timeout,

    #[error("server shutting down")]
    ShuttingDown,

    /// A dispatch handler reported a failure; logged and swallowed by the
    /// dispatcher, never fatal to the connection.
    #[error("handler failed: {0}")]
    Handler(String),
}
