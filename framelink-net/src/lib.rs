//! # framelink-net
//!
//! Stream and datagram transports for framelink.
//!
//! This crate provides:
//! - A framed stream connection with serialized writes and a perpetual read loop
//! - A stream server with a session registry and broadcast
//! - A stream client
//! - A datagram endpoint with sender-address delivery
//! - Typed message dispatch by envelope code
//! - Configuration loading and logging setup

pub mod client;
pub mod config;
pub mod connection;
pub mod datagram;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod server;
pub mod session;

pub use client::StreamClient;
pub use config::{Config, ConfigError, LogConfig, NetworkConfig, RuntimeConfig};
pub use connection::{Connection, ConnectionEvent};
pub use datagram::{DatagramEndpoint, DatagramEvent, DatagramServer};
pub use dispatch::Dispatcher;
pub use error::NetError;
pub use server::{ServerConfig, ServerStats, StreamServer};
pub use session::{Session, SessionRegistry};
