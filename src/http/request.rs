//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Adapt an axum request into the mapper's `InboundRequest`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-*` headers are never trusted for the proxy identity

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::mapper::message::InboundRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Stamps each request with a fresh UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request's ID, or `"unknown"` before the ID layer ran.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the mapper's view of an axum request.
///
/// The proxy identity is what the client addressed: the URI authority when
/// the request line carries one, else the `Host` header. The listener does
/// not terminate TLS, so the scheme is `http` unless the URI says otherwise.
pub fn inbound_request(request: Request<Body>) -> InboundRequest {
    let (parts, body) = request.into_parts();

    let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
    let host = parts
        .uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            parts
                .headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    InboundRequest {
        method: parts.method,
        scheme,
        host,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    }
}
