//! HTTP connection: message reads and writes over one socket.

use crate::codec::{self, BodyFraming};
use crate::error::HttpError;
use crate::message::HttpMessage;
use bytes::{Buf, Bytes, BytesMut};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Read buffer growth step.
const READ_CHUNK_SIZE: usize = 8192;

/// One HTTP/1.1 connection.
///
/// Reads drive the incremental parser; writes emit the serialized message
/// verbatim. One exchange is in flight at a time, which is HTTP/1.1's
/// ordering discipline.
pub struct HttpConnection {
    stream: TcpStream,
    buf: BytesMut,
}

impl HttpConnection {
    /// Wraps an accepted or connected socket.
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Connects to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self, HttpError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true).ok();
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, HttpError> {
        Ok(self.stream.peer_addr()?)
    }

    /// Reads one complete message: header block, then the body per the
    /// framing the headers announce.
    ///
    /// A clean close before any byte of the next message is
    /// [`HttpError::ConnectionClosed`]; a close mid-message is a protocol
    /// violation.
    pub async fn read_message(&mut self) -> Result<HttpMessage, HttpError> {
        let head_end = loop {
            if let Some(end) = codec::find_header_end(&self.buf) {
                break end;
            }
            if self.fill().await? == 0 {
                if self.buf.is_empty() {
                    return Err(HttpError::ConnectionClosed);
                }
                return Err(HttpError::Protocol("eof inside header block".into()));
            }
        };

        let head = self.buf.split_to(head_end);
        let (start, headers) = codec::parse_head(&head)?;

        let body = match codec::body_framing(&start, &headers)? {
            BodyFraming::Empty => Bytes::new(),
            BodyFraming::Length(length) => self.read_sized_body(length).await?,
            BodyFraming::Chunked => self.read_chunked_body().await?,
            BodyFraming::UntilClose => self.read_until_close().await?,
        };

        Ok(HttpMessage::from_parts(start, headers, body))
    }

    /// Writes one message, serialized verbatim.
    pub async fn write_message(&mut self, message: &HttpMessage) -> Result<(), HttpError> {
        let bytes = message.serialize();
        tracing::debug!("Writing HTTP message: {} bytes", bytes.len());
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    /// Writes pre-framed bytes as-is.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), HttpError> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Shuts down the write direction.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Appends up to one chunk of socket data to the read buffer.
    /// Returns the byte count; zero means the peer closed.
    async fn fill(&mut self) -> Result<usize, HttpError> {
        self.buf.reserve(READ_CHUNK_SIZE);
        Ok(self.stream.read_buf(&mut self.buf).await?)
    }

    async fn read_sized_body(&mut self, length: usize) -> Result<Bytes, HttpError> {
        while self.buf.len() < length {
            if self.fill().await? == 0 {
                return Err(HttpError::Protocol("eof inside body".into()));
            }
        }
        Ok(self.buf.split_to(length).freeze())
    }

    /// Chunked body: hex length line, payload, CRLF; terminated by a
    /// zero-length chunk and a final CRLF.
    async fn read_chunked_body(&mut self) -> Result<Bytes, HttpError> {
        let mut body = BytesMut::new();
        loop {
            let line_end = loop {
                if let Some(pos) = codec::find_crlf(&self.buf) {
                    break pos;
                }
                if self.fill().await? == 0 {
                    return Err(HttpError::Protocol("eof inside chunk header".into()));
                }
            };

            let size_line = self.buf.split_to(line_end + 2);
            let size = codec::parse_chunk_size(&size_line[..line_end])?;

            while self.buf.len() < size + 2 {
                if self.fill().await? == 0 {
                    return Err(HttpError::Protocol("eof inside chunk".into()));
                }
            }

            if size == 0 {
                // Final CRLF after the zero-length chunk.
                let crlf = self.buf.split_to(2);
                if &crlf[..] != b"\r\n" {
                    return Err(HttpError::Protocol("missing final chunk CRLF".into()));
                }
                return Ok(body.freeze());
            }

            body.extend_from_slice(&self.buf[..size]);
            if &self.buf[size..size + 2] != b"\r\n" {
                return Err(HttpError::Protocol("missing chunk CRLF".into()));
            }
            self.buf.advance(size + 2);
        }
    }

    async fn read_until_close(&mut self) -> Result<Bytes, HttpError> {
        while self.fill().await? > 0 {}
        Ok(self.buf.split().freeze())
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("buffered", &self.buf.len())
            .finish()
    }
}
