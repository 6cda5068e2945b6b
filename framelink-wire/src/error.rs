//! Wire format error types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// The read cursor would run past the end of the input.
    #[error("truncated input")]
    Truncated,

    /// String bytes are not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A schema definition could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// No message definition with this name or type code.
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// A field value does not match the schema kind at its position.
    #[error("field {index} has wrong kind, expected {expected}")]
    FieldKind {
        index: usize,
        expected: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
