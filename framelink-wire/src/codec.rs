//! Primitive and string encode/decode.
//!
//! All fixed-width values travel big-endian through the std
//! `to_be_bytes`/`from_be_bytes` primitives. Strings carry a 4-octet
//! big-endian byte-length prefix followed by UTF-8 bytes; the length is
//! the UTF-8 byte count, not the codepoint count. Read operations take a
//! cursor and advance it past the consumed bytes.

use crate::buffer::ByteBuf;
use crate::error::WireError;

macro_rules! primitive_codec {
    ($put:ident, $get:ident, $ty:ty) => {
        pub fn $put(buf: &mut ByteBuf, value: $ty) {
            buf.extend_from_slice(&value.to_be_bytes());
        }

        pub fn $get(data: &[u8], offset: &mut usize) -> Result<$ty, WireError> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let end = offset.checked_add(WIDTH).ok_or(WireError::Truncated)?;
            if end > data.len() {
                return Err(WireError::Truncated);
            }
            let mut raw = [0u8; WIDTH];
            raw.copy_from_slice(&data[*offset..end]);
            *offset = end;
            Ok(<$ty>::from_be_bytes(raw))
        }
    };
}

primitive_codec!(put_u8, get_u8, u8);
primitive_codec!(put_u16, get_u16, u16);
primitive_codec!(put_u32, get_u32, u32);
primitive_codec!(put_u64, get_u64, u64);
primitive_codec!(put_i8, get_i8, i8);
primitive_codec!(put_i16, get_i16, i16);
primitive_codec!(put_i32, get_i32, i32);
primitive_codec!(put_i64, get_i64, i64);
primitive_codec!(put_f32, get_f32, f32);
primitive_codec!(put_f64, get_f64, f64);

/// Appends a length-prefixed UTF-8 string.
pub fn put_str(buf: &mut ByteBuf, value: &str) {
    put_u32(buf, value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}

/// Reads a length-prefixed UTF-8 string, validating the byte sequence.
pub fn get_str(data: &[u8], offset: &mut usize) -> Result<String, WireError> {
    let len = get_u32(data, offset)? as usize;
    let end = offset.checked_add(len).ok_or(WireError::Truncated)?;
    if end > data.len() {
        return Err(WireError::Truncated);
    }
    let text = std::str::from_utf8(&data[*offset..end]).map_err(|_| WireError::InvalidUtf8)?;
    *offset = end;
    Ok(text.to_owned())
}

/// Appends a value onto the tail of a buffer.
pub trait WireEncode {
    fn encode(&self, buf: &mut ByteBuf);

    /// Serializes into a fresh buffer.
    fn to_bytes(&self) -> ByteBuf {
        let mut buf = ByteBuf::new();
        self.encode(&mut buf);
        buf
    }
}

/// Decodes a value starting at a cursor, advancing the cursor.
///
/// Composite implementers concatenate their fields in declaration order;
/// there is no field tagging, so readers must know the field schedule.
pub trait WireDecode: Sized {
    fn decode(data: &[u8], offset: &mut usize) -> Result<Self, WireError>;

    /// Decodes from the start of a slice.
    fn from_bytes(data: &[u8]) -> Result<Self, WireError> {
        let mut offset = 0;
        Self::decode(data, &mut offset)
    }
}

/// Both directions of the wire codec.
pub trait Wire: WireEncode + WireDecode {}

impl<T: WireEncode + WireDecode> Wire for T {}

macro_rules! primitive_wire {
    ($ty:ty, $put:ident, $get:ident) => {
        impl WireEncode for $ty {
            fn encode(&self, buf: &mut ByteBuf) {
                $put(buf, *self);
            }
        }

        impl WireDecode for $ty {
            fn decode(data: &[u8], offset: &mut usize) -> Result<Self, WireError> {
                $get(data, offset)
            }
        }
    };
}

primitive_wire!(u8, put_u8, get_u8);
primitive_wire!(u16, put_u16, get_u16);
primitive_wire!(u32, put_u32, get_u32);
primitive_wire!(u64, put_u64, get_u64);
primitive_wire!(i8, put_i8, get_i8);
primitive_wire!(i16, put_i16, get_i16);
primitive_wire!(i32, put_i32, get_i32);
primitive_wire!(i64, put_i64, get_i64);
primitive_wire!(f32, put_f32, get_f32);
primitive_wire!(f64, put_f64, get_f64);

impl WireEncode for String {
    fn encode(&self, buf: &mut ByteBuf) {
        put_str(buf, self);
    }
}

impl WireDecode for String {
    fn decode(data: &[u8], offset: &mut usize) -> Result<Self, WireError> {
        get_str(data, offset)
    }
}

impl WireEncode for &str {
    fn encode(&self, buf: &mut ByteBuf) {
        put_str(buf, self);
    }
}
