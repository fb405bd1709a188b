//! A minimal HTTP/1.1 request/response codec.
//!
//! No web framework is pulled in: the wire surface here is a single
//! request-line + headers + body parse, matching the handful of routes in
//! [`crate::routes`]. `Connection: close` is sent on every response, so
//! each accepted connection handles exactly one request.

use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A parsed HTTP/1.1 request.
#[derive(Debug)]
pub struct Request {
    /// Method, e.g. `"GET"`, uppercased as received.
    pub method: String,
    /// Path component only, percent-decoded, no query string.
    pub path: String,
    /// Query parameters, percent-decoded.
    pub query: HashMap<String, String>,
    /// Raw request body, truncated to the parsed `Content-Length`.
    pub body: Vec<u8>,
}

/// Reads and parses one request from `stream`. Returns `Ok(None)` if the
/// peer closed the connection before sending anything.
pub async fn read_request(stream: &mut TcpStream) -> io::Result<Option<Request>> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-headers",
                ))
            };
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let header_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_uppercase();
    let target = parts.next().unwrap_or_default();
    let (path, query) = split_target(target);

    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let body_start = header_end + 4;
    let mut body = buf[body_start..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-body",
            ));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(Request {
        method,
        path,
        query,
        body,
    }))
}

/// Finds the byte offset of the `\r\n\r\n` header terminator, if present.
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Splits a request target into its path and parsed query map.
fn split_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, qs)) => (urldecode(path), parse_query(qs)),
        None => (urldecode(target), HashMap::new()),
    }
}

fn parse_query(qs: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in qs.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(urldecode(key), urldecode(value));
    }
    map
}

/// Minimal percent-decoding; `+` is left as-is since query values here are
/// paths and names, not form-encoded bodies.
fn urldecode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A prepared response body, written as a single HTTP/1.1 message.
#[derive(Debug)]
pub enum Response {
    /// A JSON body with the given status code.
    Json { status: u16, body: Vec<u8> },
    /// A raw body with an explicit content type (used for `logs`).
    Raw {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    },
    /// No body, e.g. 204 No Content.
    Empty { status: u16 },
}

impl Response {
    /// Serializes `value` as a JSON response body.
    pub fn json<T: serde::Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::Json { status, body }
    }

    /// A body-less response.
    pub fn empty(status: u16) -> Self {
        Self::Empty { status }
    }
}

/// Writes `response` to `stream` as a complete HTTP/1.1 message.
pub async fn write_response(stream: &mut TcpStream, response: Response) -> io::Result<()> {
    let (status, content_type, body) = match response {
        Response::Json { status, body } => (status, "application/json", body),
        Response::Raw {
            status,
            content_type,
            body,
        } => (status, content_type, body),
        Response::Empty { status } => (status, "text/plain", Vec::new()),
    };

    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n",
        reason = reason_phrase(status),
        len = body.len(),
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_target_separates_path_and_query() {
        let (path, query) = split_target("/build?t=demo%3Alatest&dockerfile=Dockerfile");
        assert_eq!(path, "/build");
        assert_eq!(query.get("t").map(String::as_str), Some("demo:latest"));
        assert_eq!(
            query.get("dockerfile").map(String::as_str),
            Some("Dockerfile")
        );
    }

    #[test]
    fn split_target_with_no_query_string() {
        let (path, query) = split_target("/version");
        assert_eq!(path, "/version");
        assert!(query.is_empty());
    }

    #[test]
    fn find_header_end_locates_the_terminator() {
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody";
        assert_eq!(find_header_end(buf), Some(23));
    }
}
