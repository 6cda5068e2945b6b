//! # framelink-wire
//!
//! Binary wire format for framelink.
//!
//! This crate provides:
//! - A growable byte buffer with small-buffer optimization and a chunk pool
//! - Big-endian primitive and string encode/decode with cursor-based reads
//! - A typed message envelope (16-bit type code + payload)
//! - Schema-driven dynamic payloads compiled from JSON definitions

pub mod buffer;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod payload;

pub use buffer::ByteBuf;
pub use codec::{Wire, WireDecode, WireEncode};
pub use envelope::Envelope;
pub use error::WireError;
pub use payload::{DynamicPayload, FieldKind, FieldValue, PayloadFactory, Schema};

/// Size of the stream transport frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Size of the typed envelope header in bytes.
pub const ENVELOPE_HEADER_SIZE: usize = 2;

/// Maximum payload carried in one datagram (IPv4 UDP limit).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
