//! Stream server: acceptor plus session registry.

use crate::config::Config;
use crate::connection::{Connection, ConnectionEvent};
use crate::dispatch::Dispatcher;
use crate::error::NetError;
use crate::session::{Session, SessionRegistry};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Builds a server config from the loaded configuration file.
    pub fn from_config(config: &Config) -> Result<Self, NetError> {
        let bind_addr = config
            .network
            .endpoint()
            .parse()
            .map_err(|_| NetError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("bad bind address {}", config.network.endpoint()),
            )))?;
        Ok(Self::new(bind_addr))
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub frames_total: AtomicU64,
}

type DisconnectHook = Arc<dyn Fn(&str) + Send + Sync>;
type ConnectHook = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

/// Framed-stream server.
///
/// Accepts connections, wraps each in a [`Session`] with a fresh
/// identifier, tracks them in a registry, and routes every inbound frame
/// through the dispatch registry. Accept errors are logged and the accept
/// loop continues; a failing session never affects its neighbours.
pub struct StreamServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher<Arc<Session>>>,
    registry: Arc<SessionRegistry>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
    bound_tx: watch::Sender<Option<SocketAddr>>,
    bound_rx: watch::Receiver<Option<SocketAddr>>,
    on_connect: Option<ConnectHook>,
    on_disconnect: Option<DisconnectHook>,
}

impl StreamServer {
    /// Creates a server. The dispatcher must be fully populated; it is
    /// immutable once the server runs.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher<Arc<Session>>) -> Self {
        Self::with_registry(config, dispatcher, Arc::new(SessionRegistry::new()))
    }

    /// Creates a server around a shared registry, for handlers that need
    /// to reach other sessions (broadcast-style fan-out).
    pub fn with_registry(
        config: ServerConfig,
        dispatcher: Dispatcher<Arc<Session>>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (bound_tx, bound_rx) = watch::channel(None);
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            registry,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
            bound_tx,
            bound_rx,
            on_connect: None,
            on_disconnect: None,
        }
    }

    /// Installs a hook invoked after each session is registered.
    pub fn with_connect_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<Session>) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    /// Installs a hook invoked exactly once per session, after removal
    /// from the registry, with the session identifier.
    pub fn with_disconnect_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    /// Runs the accept loop until [`StreamServer::shutdown`] is called.
    pub async fn run(&self) -> Result<(), NetError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        self.running.store(true, Ordering::SeqCst);
        let _ = self.bound_tx.send(Some(local_addr));
        tracing::info!("Server listening on {}", local_addr);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            self.admit(stream, addr);
                        }
                        Err(e) => {
                            // Transient accept errors do not terminate the server.
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.registry.drain();
        Ok(())
    }

    /// The configured bind address.
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Waits until the listener is bound and returns the actual local
    /// address (resolves an ephemeral port 0 bind).
    pub async fn bound_addr(&self) -> SocketAddr {
        let mut rx = self.bound_rx.clone();
        loop {
            if let Some(addr) = *rx.borrow() {
                return addr;
            }
            if rx.changed().await.is_err() {
                return self.config.bind_addr;
            }
        }
    }

    fn admit(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        stream.set_nodelay(true).ok();

        let (connection, mut events) = Connection::spawn(stream, addr);
        let session = Arc::new(Session::new(connection));
        self.registry.insert(session.clone());

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Client connected: {} (session {})", addr, session.id());

        if let Some(hook) = &self.on_connect {
            hook(&session);
        }

        let dispatcher = self.dispatcher.clone();
        let registry = self.registry.clone();
        let stats = self.stats.clone();
        let on_disconnect = self.on_disconnect.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ConnectionEvent::Frame(frame) => {
                        stats.frames_total.fetch_add(1, Ordering::Relaxed);
                        dispatcher.dispatch(&session, &frame);
                    }
                    ConnectionEvent::Disconnected => break,
                }
            }

            registry.remove(session.id());
            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            if let Some(hook) = on_disconnect {
                hook(session.id());
            }
            tracing::info!("Client disconnected: {} (session {})", addr, session.id());
        });
    }

    /// Enqueues a frame on every currently-registered session.
    ///
    /// Delivers to a snapshot of the registry, or to none once the server
    /// has stopped. One session's failure does not affect the others.
    pub fn broadcast(&self, frame: Bytes) {
        if !self.is_running() {
            return;
        }
        for session in self.registry.snapshot() {
            if let Err(e) = session.write(frame.clone()) {
                tracing::warn!("Broadcast to session {} failed: {}", session.id(), e);
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}
