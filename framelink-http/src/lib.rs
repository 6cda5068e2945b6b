//! # framelink-http
//!
//! HTTP/1.1 on top of the stream transport.
//!
//! This crate provides:
//! - Request/response model with a case-preserving header map
//! - URL parsing with percent-decoded query parameters
//! - Incremental parser: header block, then chunked, content-length or
//!   read-until-close body framing
//! - A keep-alive-aware client and server
//!
//! HTTP replaces the length-prefix framing of the framed stream transport
//! with its own header/body grammar; everything else (runtime, config,
//! logging) is shared with `framelink-net`.

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod message;
pub mod server;
pub mod url;

pub use client::HttpClient;
pub use codec::BodyFraming;
pub use connection::HttpConnection;
pub use error::HttpError;
pub use message::{HeaderMap, HttpMessage, Method, StartLine};
pub use server::HttpServer;
pub use url::Url;
