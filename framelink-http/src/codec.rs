//! Incremental HTTP/1.1 parsing.
//!
//! The parsing pipeline: accumulate bytes until the blank line that ends
//! the header block, parse the start line and headers, then pick a body
//! framing from the headers. The header loop terminates exactly on the
//! blank line following `\r\n\r\n`.

use crate::error::HttpError;
use crate::message::{HeaderMap, Method, StartLine};

/// How the message body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// `Content-Length: N`.
    Length(usize),
    /// Read until the peer closes (responses only).
    UntilClose,
    /// No body.
    Empty,
}

/// Finds the end of the header block: the index just past `\r\n\r\n`.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Finds the next `\r\n`, returning the index of the `\r`.
pub fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == b"\r\n")
}

/// Parses a complete header block (start line through the blank line).
pub fn parse_head(head: &[u8]) -> Result<(StartLine, HeaderMap), HttpError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| HttpError::Protocol("header block is not valid UTF-8".into()))?;

    let mut lines = text.split("\r\n");
    let start_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| HttpError::Protocol("empty header block".into()))?;
    let start = parse_start_line(start_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        // The blank line after the last header ends the loop.
        if line.is_empty() {
            break;
        }
        let colon = line
            .find(':')
            .ok_or_else(|| HttpError::Protocol(format!("malformed header line: {line}")))?;
        let name = &line[..colon];
        let value = line[colon + 1..].strip_prefix(' ').unwrap_or(&line[colon + 1..]);
        headers.set(name, value);
    }

    Ok((start, headers))
}

/// Parses the first line. A recognized method token means a request;
/// otherwise the first token is the HTTP version and the line is a
/// response status line.
fn parse_start_line(line: &str) -> Result<StartLine, HttpError> {
    let mut parts = line.splitn(3, ' ');
    let first = parts
        .next()
        .ok_or_else(|| HttpError::Protocol("empty start line".into()))?;

    if let Some(method) = Method::parse(first) {
        let target = parts
            .next()
            .ok_or_else(|| HttpError::Protocol(format!("request line missing target: {line}")))?;
        let version = parts
            .next()
            .ok_or_else(|| HttpError::Protocol(format!("request line missing version: {line}")))?;
        Ok(StartLine::Request {
            method,
            target: target.to_string(),
            version: version.to_string(),
        })
    } else {
        let status = parts
            .next()
            .and_then(|token| token.parse::<u16>().ok())
            .ok_or_else(|| HttpError::Protocol(format!("malformed status line: {line}")))?;
        let reason = parts.next().unwrap_or("").to_string();
        Ok(StartLine::Response {
            version: first.to_string(),
            status,
            reason,
        })
    }
}

/// Picks the body framing for a parsed head.
///
/// Read-until-close applies to responses only: a request framed by EOF
/// could never be answered on the same connection.
pub fn body_framing(start: &StartLine, headers: &HeaderMap) -> Result<BodyFraming, HttpError> {
    if let Some(encoding) = headers.get("Transfer-Encoding") {
        if encoding.to_ascii_lowercase().contains("chunked") {
            return Ok(BodyFraming::Chunked);
        }
    }

    if let Some(length) = headers.get("Content-Length") {
        let length = length
            .trim()
            .parse::<usize>()
            .map_err(|_| HttpError::Protocol(format!("bad Content-Length: {length}")))?;
        return Ok(BodyFraming::Length(length));
    }

    if let StartLine::Response { version, .. } = start {
        let connection = headers.get("Connection").unwrap_or("");
        if connection.eq_ignore_ascii_case("close")
            || (version == "HTTP/1.0" && !connection.eq_ignore_ascii_case("keep-alive"))
        {
            return Ok(BodyFraming::UntilClose);
        }
    }

    Ok(BodyFraming::Empty)
}

/// Parses a chunk-size line (hex digits, optional `;extension`).
pub fn parse_chunk_size(line: &[u8]) -> Result<usize, HttpError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| HttpError::Protocol("chunk header is not valid UTF-8".into()))?;
    let digits = text.split(';').next().unwrap_or("").trim();
    if digits.is_empty() {
        return Err(HttpError::Protocol("empty chunk header".into()));
    }
    usize::from_str_radix(digits, 16)
        .map_err(|_| HttpError::Protocol(format!("malformed chunk header: {text}")))
}
