//! Per-request message types flowing through the pipeline.
//!
//! ```text
//! InboundRequest  ──build──▶ OutboundRequest ──send──▶ origin
//! OutboundResponse ◀─map──── InboundResponse ◀──────── origin
//! ```

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use bytes::Bytes;

use crate::mapper::headers::is_content_header;

/// The client's request as seen by the hosting server.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    /// Scheme the client used (`http` or `https`).
    pub scheme: String,
    /// Host (and port) the client addressed.
    pub host: String,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
}

impl InboundRequest {
    /// Declared `Content-Type`, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the request announces an entity body.
    ///
    /// Decided from the framing headers rather than the method name, so any
    /// method carrying a body is mapped.
    pub fn declares_body(&self) -> bool {
        declares_body(&self.headers)
    }
}

/// A positive `Content-Length` or any `Transfer-Encoding` announces a body.
pub fn declares_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// The request sent to the origin.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Replace the body and recompute its declared length.
    pub fn set_body(&mut self, body: Bytes) {
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len() as u64));
        self.body = Some(body);
    }

    pub fn content_length(&self) -> Option<u64> {
        self.body.as_ref().map(|b| b.len() as u64)
    }
}

/// The origin's answer, fully buffered.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: StatusCode,
    /// General headers.
    pub headers: HeaderMap,
    /// Headers describing the body (`Content-Type`, `Content-Length`, ...).
    pub content_headers: HeaderMap,
    pub body: Bytes,
}

impl InboundResponse {
    /// Split a raw header map into general and content headers.
    pub fn from_parts(status: StatusCode, raw_headers: HeaderMap, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        let mut content_headers = HeaderMap::new();

        let mut current: Option<HeaderName> = None;
        for (name, value) in raw_headers {
            // `None` names continue the previous header's values
            let name = match name {
                Some(name) => {
                    current = Some(name.clone());
                    name
                }
                None => match &current {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            if is_content_header(&name) {
                content_headers.append(name, value);
            } else {
                headers.append(name, value);
            }
        }

        Self {
            status,
            headers,
            content_headers,
            body,
        }
    }

    /// All values of the declared `Content-Type`.
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.content_headers
            .get_all(header::CONTENT_TYPE)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// Declared body length: the `Content-Length` header, or the buffered
    /// length when the origin did not send one.
    pub fn declared_content_length(&self) -> u64 {
        self.content_headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(self.body.len() as u64)
    }

    pub fn is_gzip(&self) -> bool {
        self.content_headers
            .get_all(header::CONTENT_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("gzip"))
    }
}

/// The response written back to the client.
#[derive(Debug)]
pub struct OutboundResponse {
    pub status: StatusCode,
    /// Append-only; duplicate names are kept.
    pub headers: HeaderMap,
    body: Vec<u8>,
}

impl OutboundResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Remove every value of a header, returning whether any was present.
    pub fn remove_header(&mut self, name: &HeaderName) -> bool {
        let removed = self.headers.contains_key(name);
        self.headers.remove(name);
        removed
    }

    /// Native cookie append: the cookie library serializes the record.
    pub fn append_cookie(&mut self, cookie: &cookie::Cookie<'_>) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Err(_) => {
                tracing::warn!(cookie = %cookie.name(), "Dropping cookie that is not a valid header value");
            }
        }
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Sequential body write.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

impl Default for OutboundResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_content_headers() {
        let mut raw = HeaderMap::new();
        raw.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        raw.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        raw.insert(header::LAST_MODIFIED, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        raw.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        raw.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let res = InboundResponse::from_parts(StatusCode::OK, raw, Bytes::new());
        assert_eq!(res.content_headers.len(), 3);
        assert_eq!(res.headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert!(!res.headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn test_declared_length_falls_back_to_buffer() {
        let res = InboundResponse::from_parts(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"hello"));
        assert_eq!(res.declared_content_length(), 5);

        let mut raw = HeaderMap::new();
        raw.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        let res = InboundResponse::from_parts(StatusCode::OK, raw, Bytes::from_static(b"hello"));
        assert_eq!(res.declared_content_length(), 0);
    }

    #[test]
    fn test_declares_body() {
        let mut req = InboundRequest {
            method: Method::PUT,
            scheme: "http".into(),
            host: "localhost".into(),
            path: "/".into(),
            query: None,
            headers: HeaderMap::new(),
            body: Body::empty(),
        };
        assert!(!req.declares_body());

        req.headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(!req.declares_body());

        req.headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("3"));
        assert!(req.declares_body());
    }

    #[test]
    fn test_remove_header_reports_presence() {
        let mut res = OutboundResponse::new();
        res.append_header(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(res.remove_header(&header::CONTENT_ENCODING));
        assert!(!res.remove_header(&header::CONTENT_ENCODING));
    }

    #[test]
    fn test_append_cookie_adds_set_cookie() {
        let mut res = OutboundResponse::new();
        res.append_cookie(&cookie::Cookie::new("a", "1"));
        res.append_cookie(&cookie::Cookie::new("b", "2"));

        let values: Vec<_> = res.headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(values, ["a=1", "b=2"]);
    }
}
