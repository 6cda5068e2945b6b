//! Stream client.

use crate::connection::{Connection, ConnectionEvent};
use crate::dispatch::Dispatcher;
use crate::error::NetError;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Framed-stream client: one outbound connection plus its event stream.
pub struct StreamClient {
    connection: Connection,
    events: mpsc::Receiver<ConnectionEvent>,
}

impl StreamClient {
    /// Connects to `host:port` with the default timeout.
    pub async fn connect(host: &str, port: u16) -> Result<Self, NetError> {
        Self::connect_with_timeout(host, port, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connects with an explicit timeout.
    pub async fn connect_with_timeout(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, NetError> {
        tracing::debug!("Connecting to {}:{}...", host, port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| NetError::Timeout)??;
        stream.set_nodelay(true).ok();

        let peer_addr = stream.peer_addr()?;
        let (connection, events) = Connection::spawn(stream, peer_addr);
        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self { connection, events })
    }

    /// Enqueues one frame for transmission.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<(), NetError> {
        self.connection.write(payload)
    }

    /// Receives the next event: a frame in arrival order, or the final
    /// disconnect. `None` after the disconnect has been observed.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Receives the next frame, treating disconnect as end of stream.
    pub async fn recv_frame(&mut self) -> Option<Bytes> {
        match self.events.recv().await {
            Some(ConnectionEvent::Frame(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Drives the event stream through a dispatch registry until the
    /// connection closes. Handlers reply through the supplied connection
    /// handle.
    pub async fn run_dispatch(&mut self, dispatcher: &Dispatcher<Connection>) {
        let endpoint = self.connection.clone();
        while let Some(event) = self.events.recv().await {
            match event {
                ConnectionEvent::Frame(frame) => dispatcher.dispatch(&endpoint, &frame),
                ConnectionEvent::Disconnected => break,
            }
        }
    }

    /// A clonable handle to the underlying connection.
    pub fn connection(&self) -> Connection {
        self.connection.clone()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.connection.peer_addr()
    }

    /// Closes the connection. Idempotent.
    pub fn close(&self) {
        self.connection.close();
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 on loopback is essentially never listening.
        let result = StreamClient::connect("127.0.0.1", 1).await;
        assert!(matches!(result, Err(NetError::Io(_)) | Err(NetError::Timeout)));
    }
}
