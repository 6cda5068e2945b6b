//! HTTP client.

use crate::connection::HttpConnection;
use crate::error::HttpError;
use crate::message::{HttpMessage, Method};
use crate::url::Url;
use bytes::Bytes;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP/1.1 client over one reusable connection.
///
/// Requests run one at a time: write, then read the next response, which
/// matches HTTP/1.1's in-order semantics. The connection is reused across
/// requests until either side closes.
pub struct HttpClient {
    connection: Option<HttpConnection>,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            connection: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Connects to the server.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), HttpError> {
        tracing::debug!("Connecting to {}:{}...", host, port);
        self.connection = Some(HttpConnection::connect(host, port).await?);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Closes the connection.
    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.shutdown().await;
        }
    }

    /// Sends a prepared request and reads its response.
    pub async fn send(&mut self, request: &HttpMessage) -> Result<HttpMessage, HttpError> {
        let connection = self.connection.as_mut().ok_or(HttpError::NotConnected)?;
        connection.write_message(request).await?;
        let response = tokio::time::timeout(self.request_timeout, connection.read_message())
            .await
            .map_err(|_| HttpError::Timeout)??;

        // A response that forbids reuse leaves the connection unusable.
        if !response.should_keep_alive() {
            self.disconnect().await;
        }
        Ok(response)
    }

    pub async fn get(&mut self, url: &str) -> Result<HttpMessage, HttpError> {
        let request = build_request(Method::Get, url, None)?;
        self.send(&request).await
    }

    pub async fn post(&mut self, url: &str, body: &str) -> Result<HttpMessage, HttpError> {
        let request = build_request(Method::Post, url, Some(body))?;
        self.send(&request).await
    }

    pub async fn put(&mut self, url: &str, body: &str) -> Result<HttpMessage, HttpError> {
        let request = build_request(Method::Put, url, Some(body))?;
        self.send(&request).await
    }

    pub async fn delete(&mut self, url: &str) -> Result<HttpMessage, HttpError> {
        let request = build_request(Method::Delete, url, None)?;
        self.send(&request).await
    }

    pub async fn head(&mut self, url: &str) -> Result<HttpMessage, HttpError> {
        let request = build_request(Method::Head, url, None)?;
        self.send(&request).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a request from a URL: origin-form target, `Host` header,
/// keep-alive, and (for supplied bodies) `Content-Length` and a plain-text
/// content type.
fn build_request(method: Method, url: &str, body: Option<&str>) -> Result<HttpMessage, HttpError> {
    let url = Url::parse(url)?;
    let mut request = HttpMessage::request(method, url.target());
    request.set_header("Host", url.host());
    request.set_header("Connection", "keep-alive");

    if let Some(body) = body {
        request.set_header("Content-Length", body.len().to_string());
        request.set_header("Content-Type", "text/plain");
        request.set_body(Bytes::copy_from_slice(body.as_bytes()));
    }
    Ok(request)
}
