//! Stream transport frame header.
//!
//! The stream transport delimits frames with a 4-octet little-endian length
//! prefix followed by that many payload octets. The little-endian prefix is
//! the one exception to the big-endian payload codec; it is kept for byte
//! compatibility with existing peers.

use crate::buffer::ByteBuf;
use crate::FRAME_HEADER_SIZE;

/// Encodes a frame length into the on-wire header.
pub fn encode_header(len: u32) -> [u8; FRAME_HEADER_SIZE] {
    len.to_le_bytes()
}

/// Decodes the on-wire header into a frame length.
pub fn decode_header(header: [u8; FRAME_HEADER_SIZE]) -> u32 {
    u32::from_le_bytes(header)
}

/// Builds a complete frame: header plus payload.
pub fn encode_frame(payload: &[u8]) -> ByteBuf {
    let mut buf = ByteBuf::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&encode_header(payload.len() as u32));
    buf.extend_from_slice(payload);
    buf
}
