//! # framelink
//!
//! Connection-oriented network messaging substrate.
//!
//! This facade crate re-exports the workspace layers:
//! - [`wire`]: byte buffer, binary codec, typed envelope, dynamic payloads
//! - [`net`]: framed stream transport, datagram transport, dispatch, config
//! - [`http`]: HTTP/1.1 codec, client and server on the stream transport

pub use framelink_http as http;
pub use framelink_net as net;
pub use framelink_wire as wire;
