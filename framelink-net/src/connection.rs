//! Framed stream connection.
//!
//! A connection turns one byte-stream socket into an ordered sequence of
//! length-delimited frames. Per-connection state lives inside two spawned
//! tasks (a writer draining a command queue, and a perpetual reader), so
//! callers on any task may write or close without locks. Writes reach the
//! wire whole and in enqueue order; inbound frames surface whole and in
//! arrival order.
//!
//! Events are consumed outside the connection's own tasks, so an event-loop
//! handler may freely call [`Connection::write`] or [`Connection::close`]
//! without deadlocking the read path.

use bytes::{Bytes, BytesMut};
use framelink_wire::{frame, WireError, FRAME_HEADER_SIZE};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::NetError;

/// Maximum frame payload accepted from the wire (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Capacity of the inbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event surfaced by a connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// One complete inbound frame payload, length prefix stripped.
    Frame(Bytes),
    /// The connection is gone. Emitted exactly once, after the last frame.
    Disconnected,
}

enum Command {
    Write(Bytes),
    Close,
}

/// Handle to a framed stream connection.
///
/// Cheap to clone; all clones drive the same socket.
#[derive(Clone)]
pub struct Connection {
    peer_addr: SocketAddr,
    commands: mpsc::UnboundedSender<Command>,
    close_tx: mpsc::Sender<()>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Wraps a connected socket, spawning its reader and writer tasks.
    ///
    /// The returned receiver yields every inbound frame in arrival order,
    /// then [`ConnectionEvent::Disconnected`] exactly once.
    pub fn spawn(stream: TcpStream, peer_addr: SocketAddr) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (read_half, write_half) = stream.into_split();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_loop(
            write_half,
            commands_rx,
            close_tx.clone(),
            peer_addr,
        ));
        tokio::spawn(read_loop(
            read_half,
            close_rx,
            events_tx,
            commands_tx.clone(),
            closed.clone(),
            peer_addr,
        ));

        let connection = Self {
            peer_addr,
            commands: commands_tx,
            close_tx,
            closed,
        };
        (connection, events_rx)
    }

    /// Enqueues one frame for transmission.
    ///
    /// The 4-octet length prefix is prepended by the writer task. Callable
    /// from any task; frames reach the wire in enqueue order. Frames queued
    /// at the moment of a transport error may be lost (at-most-once).
    pub fn write(&self, payload: impl Into<Bytes>) -> Result<(), NetError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetError::Closed);
        }
        self.commands
            .send(Command::Write(payload.into()))
            .map_err(|_| NetError::Closed)
    }

    /// Closes the connection. Idempotent and safe from any task.
    ///
    /// Pending I/O is cancelled, both directions are shut down, and the
    /// event receiver sees [`ConnectionEvent::Disconnected`] exactly once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.commands.send(Command::Close);
        let _ = self.close_tx.try_send(());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drains the command queue, writing frames in order.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut commands: mpsc::UnboundedReceiver<Command>,
    close_tx: mpsc::Sender<()>,
    peer_addr: SocketAddr,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Write(payload) => {
                tracing::debug!("[{}] Writing frame: {} bytes", peer_addr, payload.len());
                let header = frame::encode_header(payload.len() as u32);
                let result: io::Result<()> = async {
                    write_half.write_all(&header).await?;
                    write_half.write_all(&payload).await
                }
                .await;
                if let Err(e) = result {
                    tracing::error!("[{}] Write error: {}", peer_addr, e);
                    break;
                }
            }
            Command::Close => break,
        }
    }

    // Shutdown errors other than "not connected" are logged; close always
    // completes.
    if let Err(e) = write_half.shutdown().await {
        if e.kind() != io::ErrorKind::NotConnected {
            tracing::error!("[{}] Error shutting down socket: {}", peer_addr, e);
        }
    }
    let _ = close_tx.try_send(());
}

/// Perpetual read loop: header, body, deliver, repeat.
async fn read_loop(
    mut read_half: OwnedReadHalf,
    mut close_rx: mpsc::Receiver<()>,
    events: mpsc::Sender<ConnectionEvent>,
    commands: mpsc::UnboundedSender<Command>,
    closed: Arc<AtomicBool>,
    peer_addr: SocketAddr,
) {
    loop {
        let payload = tokio::select! {
            _ = close_rx.recv() => break,
            result = read_frame(&mut read_half) => match result {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    tracing::info!("[{}] Connection closed by peer", peer_addr);
                    break;
                }
                Err(e) => {
                    tracing::error!("[{}] Read error: {}", peer_addr, e);
                    break;
                }
            },
        };
        tracing::debug!("[{}] Received frame: {} bytes", peer_addr, payload.len());
        if events.send(ConnectionEvent::Frame(payload)).await.is_err() {
            break;
        }
    }

    closed.store(true, Ordering::SeqCst);
    let _ = commands.send(Command::Close);
    let _ = events.send(ConnectionEvent::Disconnected).await;
}

/// Reads one frame. `Ok(None)` is a graceful close at the frame boundary;
/// EOF mid-body is a truncation error.
async fn read_frame(read_half: &mut OwnedReadHalf) -> Result<Option<Bytes>, NetError> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    match read_half.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = frame::decode_header(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(NetError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut payload = BytesMut::zeroed(len);
    match read_half.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload.freeze())),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(NetError::Wire(WireError::Truncated))
        }
        Err(e) => Err(e.into()),
    }
}
