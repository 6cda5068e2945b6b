//! Datagram endpoint.
//!
//! A bound UDP socket with a serially-drained send queue and a perpetual
//! receive loop that surfaces each packet with its sender address.
//! Datagrams are independent; there is no reassembly. Send and receive
//! errors are logged and the endpoint stays up until an explicit close.

use crate::dispatch::Dispatcher;
use crate::error::NetError;
use bytes::Bytes;
use framelink_wire::MAX_DATAGRAM_SIZE;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Capacity of the inbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event surfaced by a datagram endpoint.
#[derive(Debug)]
pub enum DatagramEvent {
    /// One packet: sender address and payload, trimmed to the received
    /// length.
    Packet(SocketAddr, Bytes),
    /// The endpoint was closed. Emitted exactly once, last.
    Closed,
}

enum Command {
    Send(SocketAddr, Bytes),
    Close,
}

/// Handle to a bound datagram socket.
///
/// Cheap to clone; all clones drive the same socket.
#[derive(Clone)]
pub struct DatagramEndpoint {
    local_addr: SocketAddr,
    commands: mpsc::UnboundedSender<Command>,
    close_tx: mpsc::Sender<()>,
    closed: Arc<AtomicBool>,
}

impl DatagramEndpoint {
    /// Binds a socket. Port 0 requests an ephemeral port; the actual
    /// address is available from [`DatagramEndpoint::local_addr`].
    pub async fn bind(addr: SocketAddr) -> Result<(Self, mpsc::Receiver<DatagramEvent>), NetError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let local_addr = socket.local_addr()?;
        tracing::info!("Datagram endpoint bound on {}", local_addr);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(send_loop(socket.clone(), commands_rx, local_addr));
        tokio::spawn(receive_loop(
            socket,
            close_rx,
            events_tx,
            closed.clone(),
            local_addr,
        ));

        let endpoint = Self {
            local_addr,
            commands: commands_tx,
            close_tx,
            closed,
        };
        Ok((endpoint, events_rx))
    }

    /// Enqueues one datagram. Sends drain in queue order.
    pub fn send_to(&self, recipient: SocketAddr, payload: impl Into<Bytes>) -> Result<(), NetError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetError::Closed);
        }
        self.commands
            .send(Command::Send(recipient, payload.into()))
            .map_err(|_| NetError::Closed)
    }

    /// Closes the endpoint. Idempotent.
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

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for DatagramEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramEndpoint")
            .field("local_addr", &self.local_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drains the send queue serially.
async fn send_loop(
    socket: Arc<UdpSocket>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    local_addr: SocketAddr,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Send(recipient, payload) => {
                if let Err(e) = socket.send_to(&payload, recipient).await {
                    tracing::error!("[{}] Error sending datagram to {}: {}", local_addr, recipient, e);
                }
            }
            Command::Close => break,
        }
    }
}

/// Perpetual receive loop with a maximum-size buffer.
async fn receive_loop(
    socket: Arc<UdpSocket>,
    mut close_rx: mpsc::Receiver<()>,
    events: mpsc::Sender<DatagramEvent>,
    closed: Arc<AtomicBool>,
    local_addr: SocketAddr,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, sender) = tokio::select! {
            _ = close_rx.recv() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    tracing::error!("[{}] Error receiving datagram: {}", local_addr, e);
                    continue;
                }
            },
        };
        let payload = Bytes::copy_from_slice(&buf[..len]);
        if events.send(DatagramEvent::Packet(sender, payload)).await.is_err() {
            break;
        }
    }

    closed.store(true, Ordering::SeqCst);
    let _ = events.send(DatagramEvent::Closed).await;
}

/// Datagram server: a bound endpoint driving a dispatch registry.
///
/// Handlers receive the packet's sender address; replies go through a
/// cloned endpoint handle captured at registration time.
pub struct DatagramServer {
    endpoint: DatagramEndpoint,
    events: mpsc::Receiver<DatagramEvent>,
    dispatcher: Dispatcher<SocketAddr>,
}

impl DatagramServer {
    pub async fn bind(addr: SocketAddr, dispatcher: Dispatcher<SocketAddr>) -> Result<Self, NetError> {
        let (endpoint, events) = DatagramEndpoint::bind(addr).await?;
        Ok(Self {
            endpoint,
            events,
            dispatcher,
        })
    }

    /// A clonable handle for replies and shutdown.
    pub fn endpoint(&self) -> DatagramEndpoint {
        self.endpoint.clone()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Routes packets through the dispatcher until the endpoint closes.
    pub async fn run(&mut self) {
        while let Some(event) = self.events.recv().await {
            match event {
                DatagramEvent::Packet(sender, payload) => {
                    self.dispatcher.dispatch(&sender, &payload);
                }
                DatagramEvent::Closed => break,
            }
        }
    }
}
