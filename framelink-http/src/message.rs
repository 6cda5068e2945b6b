//! HTTP message model.

use bytes::Bytes;
use std::fmt;

/// Request methods the codec recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    /// Parses a start-line token. `None` when the token is not a
    /// recognized method (the parser then treats the message as a
    /// response).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header map: case-preserving keys, last-write-wins on duplicates.
///
/// Lookup compares names case-insensitively (header names are
/// case-insensitive on the wire); the stored casing is whichever write
/// came last.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            *entry = (name, value);
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First line of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request {
        method: Method,
        target: String,
        version: String,
    },
    Response {
        version: String,
        status: u16,
        reason: String,
    },
}

impl fmt::Display for StartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request {
                method,
                target,
                version,
            } => write!(f, "{} {} {}", method, target, version),
            Self::Response {
                version,
                status,
                reason,
            } => write!(f, "{} {} {}", version, status, reason),
        }
    }
}

/// One HTTP request or response.
#[derive(Debug, Clone)]
pub struct HttpMessage {
    start: StartLine,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpMessage {
    /// A new HTTP/1.1 request.
    pub fn request(method: Method, target: impl Into<String>) -> Self {
        Self {
            start: StartLine::Request {
                method,
                target: target.into(),
                version: "HTTP/1.1".to_string(),
            },
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A new HTTP/1.1 response.
    pub fn response(status: u16, reason: impl Into<String>) -> Self {
        Self {
            start: StartLine::Response {
                version: "HTTP/1.1".to_string(),
                status,
                reason: reason.into(),
            },
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn from_parts(start: StartLine, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            start,
            headers,
            body,
        }
    }

    pub fn start_line(&self) -> &StartLine {
        &self.start
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start, StartLine::Request { .. })
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start, StartLine::Response { .. })
    }

    pub fn method(&self) -> Option<Method> {
        match &self.start {
            StartLine::Request { method, .. } => Some(*method),
            StartLine::Response { .. } => None,
        }
    }

    /// The raw request target (path plus optional query).
    pub fn target(&self) -> Option<&str> {
        match &self.start {
            StartLine::Request { target, .. } => Some(target),
            StartLine::Response { .. } => None,
        }
    }

    /// The request path with any query string stripped.
    pub fn path(&self) -> Option<&str> {
        self.target()
            .map(|target| target.split('?').next().unwrap_or(target))
    }

    pub fn version(&self) -> &str {
        match &self.start {
            StartLine::Request { version, .. } => version,
            StartLine::Response { version, .. } => version,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match &self.start {
            StartLine::Response { status, .. } => Some(*status),
            StartLine::Request { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.start {
            StartLine::Response { reason, .. } => Some(reason),
            StartLine::Request { .. } => None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Builder-style header assignment.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Sets the body octets verbatim. `Content-Length` is never computed
    /// here; the caller sets it.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether the connection should be reused after this exchange:
    /// `Connection: keep-alive`, or HTTP/1.1 without `Connection: close`.
    pub fn should_keep_alive(&self) -> bool {
        let connection = self.header("Connection").unwrap_or("");
        connection.eq_ignore_ascii_case("keep-alive")
            || (self.version() == "HTTP/1.1" && !connection.eq_ignore_ascii_case("close"))
    }

    /// Serialized form: start line, one header per line, a blank line,
    /// then the body octets verbatim.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(self.start.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        for (name, value) in self.headers.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("PATCH"), Some(Method::Patch));
        assert_eq!(Method::parse("HTTP/1.1"), None);
        assert_eq!(Method::parse("get"), None);
    }

    #[test]
    fn test_header_map_last_write_wins() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/plain");
        headers.set("content-type", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
        // The stored casing is the newest write's.
        assert_eq!(headers.iter().next().unwrap().0, "content-type");
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.set("Transfer-Encoding", "chunked");
        assert_eq!(headers.get("transfer-encoding"), Some("chunked"));
        assert_eq!(headers.get("TRANSFER-ENCODING"), Some("chunked"));
    }

    #[test]
    fn test_serialize_request() {
        let request = HttpMessage::request(Method::Get, "/chat")
            .with_header("Host", "127.0.0.1")
            .with_header("Connection", "keep-alive");

        let text = String::from_utf8(request.serialize()).unwrap();
        assert_eq!(
            text,
            "GET /chat HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: keep-alive\r\n\r\n"
        );
    }

    #[test]
    fn test_serialize_response_with_body() {
        let response = HttpMessage::response(200, "OK")
            .with_header("Content-Length", "13")
            .with_body(Bytes::from_static(b"Hello, World!"));

        let bytes = response.serialize();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, World!"
        );
    }

    #[test]
    fn test_should_keep_alive() {
        let mut message = HttpMessage::request(Method::Get, "/");
        assert!(message.should_keep_alive()); // HTTP/1.1 default

        message.set_header("Connection", "close");
        assert!(!message.should_keep_alive());

        message.set_header("Connection", "keep-alive");
        assert!(message.should_keep_alive());
    }

    #[test]
    fn test_path_strips_query() {
        let request = HttpMessage::request(Method::Get, "/chat?room=1&user=a");
        assert_eq!(request.path(), Some("/chat"));
        assert_eq!(request.target(), Some("/chat?room=1&user=a"));
    }
}
