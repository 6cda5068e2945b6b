//! Typed message envelope.
//!
//! Every dispatched message starts with a 2-octet big-endian type code.
//! The code is an opaque application-defined key; dispatch peels it without
//! parsing the payload, and handlers receive the full frame so they may
//! re-decode.

use crate::buffer::ByteBuf;
use crate::codec::{self, WireDecode, WireEncode};
use crate::error::WireError;

/// Reads the type code of a frame without consuming the payload.
pub fn peek_kind(data: &[u8]) -> Result<i16, WireError> {
    let mut offset = 0;
    codec::get_i16(data, &mut offset)
}

/// A 16-bit type code plus a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub kind: i16,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(kind: i16, payload: T) -> Self {
        Self { kind, payload }
    }
}

impl<T: WireEncode> WireEncode for Envelope<T> {
    fn encode(&self, buf: &mut ByteBuf) {
        codec::put_i16(buf, self.kind);
        self.payload.encode(buf);
    }
}

impl<T: WireDecode> WireDecode for Envelope<T> {
    fn decode(data: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        let kind = codec::get_i16(data, offset)?;
        let payload = T::decode(data, offset)?;
        Ok(Self { kind, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_layout() {
        let envelope = Envelope::new(7, "ping".to_string());
        let bytes = envelope.to_bytes();
        assert_eq!(
            bytes.as_slice(),
            &[0x00, 0x07, 0x00, 0x00, 0x00, 0x04, b'p', b'i', b'n', b'g']
        );
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = Envelope::new(-3, 0xCAFEBABEu32);
        let bytes = envelope.to_bytes();
        let decoded = Envelope::<u32>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_peek_kind() {
        let envelope = Envelope::new(258, "x".to_string());
        let bytes = envelope.to_bytes();
        assert_eq!(peek_kind(&bytes).unwrap(), 258);
    }

    #[test]
    fn test_peek_kind_short_frame() {
        assert!(matches!(peek_kind(&[0x01]), Err(WireError::Truncated)));
        assert!(matches!(peek_kind(&[]), Err(WireError::Truncated)));
    }

    #[test]
    fn test_decode_is_segmentation_independent() {
        // The parse depends only on the assembled bytes, however the write
        // was segmented on the wire.
        let envelope = Envelope::new(7, "ping".to_string());
        let bytes = envelope.to_bytes();

        let mut reassembled = Vec::new();
        for chunk in bytes.as_slice().chunks(3) {
            reassembled.extend_from_slice(chunk);
        }
        let decoded = Envelope::<String>::from_bytes(&reassembled).unwrap();
        assert_eq!(decoded.kind, 7);
        assert_eq!(decoded.payload, "ping");
    }
}
