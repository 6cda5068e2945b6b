//! HTTP server.

use crate::connection::HttpConnection;
use crate::error::HttpError;
use crate::message::{HttpMessage, Method};
use framelink_net::{Config, NetError, ServerConfig};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};

type RequestHandler = Arc<dyn Fn(&HttpMessage) -> HttpMessage + Send + Sync>;
type RouteKey = (Method, String);

/// HTTP/1.1 server with a `(method, path)` route table.
///
/// Each accepted connection is served on its own task: read a request,
/// run the route handler (404 when unmatched), write the response, and
/// loop while the request asks for keep-alive.
pub struct HttpServer {
    config: ServerConfig,
    routes: HashMap<RouteKey, RequestHandler>,
    shutdown: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
    bound_tx: watch::Sender<Option<SocketAddr>>,
    bound_rx: watch::Receiver<Option<SocketAddr>>,
}

impl HttpServer {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (bound_tx, bound_rx) = watch::channel(None);
        Self {
            config,
            routes: HashMap::new(),
            shutdown: shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
            bound_tx,
            bound_rx,
        }
    }

    /// Builds a server from the loaded configuration file.
    pub fn from_config(config: &Config) -> Result<Self, NetError> {
        Ok(Self::new(ServerConfig::from_config(config)?))
    }

    /// Registers a handler for `(method, path)`. Routes must be in place
    /// before [`HttpServer::run`]; they are immutable afterward.
    pub fn route<F>(&mut self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(&HttpMessage) -> HttpMessage + Send + Sync + 'static,
    {
        self.routes.insert((method, path.into()), Arc::new(handler));
    }

    /// Runs the accept loop until [`HttpServer::shutdown`] is called.
    pub async fn run(&self) -> Result<(), HttpError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        self.running.store(true, Ordering::SeqCst);
        let _ = self.bound_tx.send(Some(local_addr));
        tracing::info!("HTTP server listening on {}", local_addr);

        let routes = Arc::new(self.routes.clone());

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let routes = routes.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, addr, routes).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("HTTP server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
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

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Serves one connection until close or a non-keep-alive exchange.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    routes: Arc<HashMap<RouteKey, RequestHandler>>,
) {
    stream.set_nodelay(true).ok();
    let mut connection = HttpConnection::new(stream);
    tracing::info!("Client connected: {}", addr);

    loop {
        let request = match connection.read_message().await {
            Ok(request) => request,
            Err(HttpError::ConnectionClosed) => break,
            Err(e) => {
                tracing::warn!("[{}] Bad request: {}", addr, e);
                break;
            }
        };

        let keep_alive = request.should_keep_alive();
        let response = respond(&routes, &request, addr);

        if let Err(e) = connection.write_message(&response).await {
            tracing::warn!("[{}] Write error: {}", addr, e);
            break;
        }

        if !keep_alive {
            break;
        }
    }

    connection.shutdown().await;
    tracing::info!("Client disconnected: {}", addr);
}

fn respond(
    routes: &HashMap<RouteKey, RequestHandler>,
    request: &HttpMessage,
    addr: SocketAddr,
) -> HttpMessage {
    let Some(method) = request.method() else {
        return not_found();
    };
    let Some(path) = request.path() else {
        return not_found();
    };

    tracing::info!("[{}] {} {}", addr, method, path);
    match routes.get(&(method, path.to_string())) {
        Some(handler) => handler(request),
        None => not_found(),
    }
}

fn not_found() -> HttpMessage {
    HttpMessage::response(404, "Not Found")
        .with_header("Content-Length", "0")
        .with_header("Connection", "close")
}
