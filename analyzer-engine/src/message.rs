//! Raw HTTP message views
//!
//! Read-only projections over the raw request/response bytes the intercepting
//! transport hands in: ordered header lines, body span, status code, declared
//! content-type class and MIME hint. Also rebuilds a wire-correct message
//! from a header list plus body for the replay transport.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Declared content-type class of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentTypeClass {
    None,
    UrlEncoded,
    Multipart,
    Json,
}

/// MIME hint of a response, declared by Content-Type or inferred from the
/// body when the declaration is absent or unhelpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeHint {
    Html,
    Json,
    Other,
}

/// Locate the body offset: the byte just past the header/body separator.
/// Falls back from CRLF CRLF to bare LF LF; a message without a separator is
/// treated as all headers.
fn body_offset(raw: &[u8]) -> usize {
    if let Some(pos) = find_subsequence(raw, b"\r\n\r\n") {
        return pos + 4;
    }
    if let Some(pos) = find_subsequence(raw, b"\n\n") {
        return pos + 2;
    }
    raw.len()
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn split_header_lines(head: &str) -> Vec<String> {
    head.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn header_value<'a>(headers: &'a [String], key: &str) -> Option<&'a str> {
    let prefix = format!("{}:", key);
    headers
        .iter()
        .find(|line| line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(&prefix))
        .map(|line| line[prefix.len()..].trim())
}

/// Read-only projection of a raw HTTP request.
#[derive(Debug, Clone)]
pub struct RequestView {
    raw: Vec<u8>,
    headers: Vec<String>,
    body_offset: usize,
}

impl RequestView {
    /// Parse a raw request into header lines and a body span
    pub fn parse(raw: &[u8]) -> EngineResult<Self> {
        if raw.is_empty() {
            return Err(EngineError::incomplete("empty request bytes"));
        }
        let offset = body_offset(raw);
        let head = String::from_utf8_lossy(&raw[..offset]);
        let headers = split_header_lines(&head);
        if headers.is_empty() {
            return Err(EngineError::incomplete("request has no header lines"));
        }
        Ok(Self {
            raw: raw.to_vec(),
            headers,
            body_offset: offset,
        })
    }

    /// Ordered header lines; index 0 is the request line
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The request line (`METHOD /path?query HTTP/1.1`)
    pub fn request_line(&self) -> &str {
        &self.headers[0]
    }

    /// Body bytes
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_offset..]
    }

    /// Body decoded lossily as UTF-8
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    /// Declared content-type class of the body
    pub fn content_type_class(&self) -> ContentTypeClass {
        match header_value(&self.headers, "Content-Type") {
            Some(value) => {
                let value = value.to_ascii_lowercase();
                if value.starts_with("application/x-www-form-urlencoded") {
                    ContentTypeClass::UrlEncoded
                } else if value.starts_with("multipart/") {
                    ContentTypeClass::Multipart
                } else if value.contains("json") {
                    ContentTypeClass::Json
                } else {
                    ContentTypeClass::None
                }
            }
            None => ContentTypeClass::None,
        }
    }

    /// Request parameters: query-string pairs from the request line followed
    /// by body pairs when the body is url-encoded. Names and values are kept
    /// raw (undecoded) so they match the wire text they came from.
    pub fn parameters(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(query) = self.query_string() {
            collect_pairs(query, &mut params);
        }
        if self.content_type_class() == ContentTypeClass::UrlEncoded {
            collect_pairs(&self.body_string(), &mut params);
        }
        params
    }

    fn query_string(&self) -> Option<&str> {
        let line = self.request_line();
        let path = line.split(' ').nth(1)?;
        path.split_once('?').map(|(_, query)| query)
    }
}

fn collect_pairs(encoded: &str, out: &mut Vec<(String, String)>) {
    for pair in encoded.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if !name.is_empty() {
                out.push((name.to_string(), value.to_string()));
            }
        }
    }
}

/// Read-only projection of a raw HTTP response.
#[derive(Debug, Clone)]
pub struct ResponseView {
    raw: Vec<u8>,
    headers: Vec<String>,
    body_offset: usize,
    status_code: u16,
}

impl ResponseView {
    /// Parse a raw response; fails if the status line cannot be read
    pub fn parse(raw: &[u8]) -> EngineResult<Self> {
        if raw.is_empty() {
            return Err(EngineError::incomplete("empty response bytes"));
        }
        let offset = body_offset(raw);
        let head = String::from_utf8_lossy(&raw[..offset]);
        let headers = split_header_lines(&head);
        let status_line = headers
            .first()
            .ok_or_else(|| EngineError::malformed("response has no status line"))?;
        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                EngineError::malformed(&format!("unparseable status line '{}'", status_line))
            })?;
        Ok(Self {
            raw: raw.to_vec(),
            headers,
            body_offset: offset,
            status_code,
        })
    }

    /// Ordered header lines; index 0 is the status line
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Raw bytes of the whole response
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Body bytes
    pub fn body(&self) -> &[u8] {
        &self.raw[self.body_offset..]
    }

    /// Body decoded lossily as UTF-8
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    /// Header block (everything before the body separator) as text
    pub fn header_block(&self) -> String {
        String::from_utf8_lossy(&self.raw[..self.body_offset]).into_owned()
    }

    /// Combined MIME hint: HTML when either the declared or the inferred
    /// hint says so, then JSON on the same basis, else `Other`
    pub fn mime_hint(&self) -> MimeHint {
        let stated = self.stated_mime_hint();
        let inferred = self.inferred_mime_hint();
        if stated == MimeHint::Html || inferred == MimeHint::Html {
            MimeHint::Html
        } else if stated == MimeHint::Json || inferred == MimeHint::Json {
            MimeHint::Json
        } else {
            MimeHint::Other
        }
    }

    fn stated_mime_hint(&self) -> MimeHint {
        match header_value(&self.headers, "Content-Type") {
            Some(value) => {
                let value = value.to_ascii_lowercase();
                if value.contains("html") {
                    MimeHint::Html
                } else if value.contains("json") {
                    MimeHint::Json
                } else {
                    MimeHint::Other
                }
            }
            None => MimeHint::Other,
        }
    }

    fn inferred_mime_hint(&self) -> MimeHint {
        let body = self.body_string();
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            MimeHint::Html
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            MimeHint::Json
        } else {
            MimeHint::Other
        }
    }
}

/// Serialize a header list plus body into a wire-correct raw message.
pub fn build_http_message(headers: &[String], body: &[u8]) -> Vec<u8> {
    let head = headers.join("\r\n");
    let mut message = Vec::with_capacity(head.len() + 4 + body.len());
    message.extend_from_slice(head.as_bytes());
    message.extend_from_slice(b"\r\n\r\n");
    message.extend_from_slice(body);
    message
}
