//! URL parsing.

use crate::error::HttpError;
use std::collections::HashMap;

/// A parsed `scheme://host[:port]/path?query` URL.
///
/// Query parameters are percent-decoded with `+` treated as space. The
/// path and raw query round-trip byte-for-byte; no re-encoding happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    raw_query: Option<String>,
    query: HashMap<String, String>,
}

impl Url {
    pub fn parse(input: &str) -> Result<Self, HttpError> {
        let (scheme, rest) = match input.find("://") {
            Some(pos) => (input[..pos].to_string(), &input[pos + 3..]),
            None => (String::new(), input),
        };

        let (authority, path_and_query) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rfind(':') {
            Some(pos) => {
                let port = authority[pos + 1..]
                    .parse::<u16>()
                    .map_err(|_| HttpError::InvalidUrl(format!("bad port in {input}")))?;
                (authority[..pos].to_string(), Some(port))
            }
            None => (authority.to_string(), None),
        };

        let (path, raw_query) = match path_and_query.find('?') {
            Some(pos) => (
                path_and_query[..pos].to_string(),
                Some(path_and_query[pos + 1..].to_string()),
            ),
            None => (path_and_query.to_string(), None),
        };

        let query = raw_query
            .as_deref()
            .map(parse_query)
            .unwrap_or_default();

        Ok(Self {
            scheme,
            host,
            port,
            path,
            raw_query,
            query,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// The path, defaulting to `/` when the URL had none.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Percent-decoded query parameters.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// The request target for the start line: path plus the raw query.
    pub fn target(&self) -> String {
        match &self.raw_query {
            Some(raw) => format!("{}?{}", self.path, raw),
            None => self.path.clone(),
        }
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in raw.split('&') {
        if let Some(pos) = pair.find('=') {
            params.insert(
                percent_decode(&pair[..pos]),
                percent_decode(&pair[pos + 1..]),
            );
        }
    }
    params
}

/// Percent-decodes a query component. `+` becomes a space; malformed
/// escapes pass through literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(value) => {
                        out.push(value);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
