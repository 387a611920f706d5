//! Header translation in both directions.
//!
//! # Responsibilities
//! - Drop proxy-hop headers before they reach the origin
//! - Collapse multi-valued request headers into one `"; "` joined value
//! - Rewrite `Referer`/`Referrer`/`Origin` towards the target
//! - Rewrite `Location` back towards the proxy
//! - Hand `Set-Cookie` to the cookie translator
//!
//! # Design Decisions
//! - Content headers are mapped in their own pass; the body stage may still
//!   change `Content-Length`/`Content-Encoding` afterwards
//! - Malformed values are passed through verbatim, never rejected

use std::collections::HashSet;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::mapper::cookies::CookieTranslator;
use crate::mapper::hooks::{MapperHooks, RequestContext};
use crate::mapper::identity::UrlRewriter;
use crate::mapper::message::{InboundResponse, OutboundResponse};

/// Headers added by CDNs and front proxies that never go to the origin.
pub const DEFAULT_EXCLUDED_HEADERS: &[&str] = &[
    "priority",
    "cf-ray",
    "cdn-loop",
    "cf-connecting-ip",
    "cf-ipcountry",
    "cf-visitor",
    "x-forwarded-proto",
    "x-forwarded-server",
    "x-forwarded-port",
    "x-real-ip",
    "x-forwarded-host",
    "x-forwarded-for",
];

/// Headers that describe the body rather than the message.
pub const CONTENT_HEADERS: &[&str] = &[
    "allow",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "expires",
    "last-modified",
];

/// Request headers recomputed by the pipeline itself.
const RECOMPUTED_REQUEST_HEADERS: &[&str] = &["host", "content-length", "transfer-encoding"];

pub fn is_content_header(name: &HeaderName) -> bool {
    CONTENT_HEADERS.contains(&name.as_str())
}

/// Set of request header names never copied to the origin.
#[derive(Debug, Clone)]
pub struct HeaderExclusionSet {
    names: HashSet<String>,
}

impl HeaderExclusionSet {
    /// The default set extended with additional names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in extra {
            set.names.insert(name.as_ref().trim().to_ascii_lowercase());
        }
        set
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        // HeaderName is always lowercase
        self.names.contains(name.as_str())
    }
}

impl Default for HeaderExclusionSet {
    fn default() -> Self {
        Self {
            names: DEFAULT_EXCLUDED_HEADERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Default value mapping for an outbound request header.
///
/// Only `Referer`, `Referrer` and `Origin` carry the proxy identity back to the
/// origin, so only those are rewritten.
pub fn default_request_header_value(rewriter: &UrlRewriter, name: &HeaderName, value: &str) -> String {
    match name.as_str() {
        "referer" | "referrer" | "origin" => rewriter.to_target(value),
        _ => value.to_string(),
    }
}

/// Build the outbound request headers from the inbound ones.
pub fn map_request_headers(
    inbound: &HeaderMap,
    exclusions: &HeaderExclusionSet,
    hooks: &dyn MapperHooks,
    ctx: &RequestContext<'_>,
) -> HeaderMap {
    let mut outbound = HeaderMap::new();

    for name in inbound.keys() {
        if exclusions.contains(name) || RECOMPUTED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }

        // Values that are not visible ASCII skip the hook and go out verbatim
        let mapped: Vec<Vec<u8>> = inbound
            .get_all(name)
            .iter()
            .map(|value| match value.to_str() {
                Ok(text) => hooks.map_request_header(ctx, name, text).into_bytes(),
                Err(_) => value.as_bytes().to_vec(),
            })
            .collect();

        let joined = mapped.join(&b"; "[..]);
        match HeaderValue::from_bytes(&joined) {
            Ok(value) => {
                outbound.insert(name.clone(), value);
            }
            Err(_) => {
                tracing::warn!(header = %name, "Skipping request header with unwritable value");
            }
        }
    }

    outbound
}

/// Map the origin's general headers onto the client response.
pub fn map_response_headers(
    origin: &InboundResponse,
    response: &mut OutboundResponse,
    rewriter: &UrlRewriter,
    cookies: &CookieTranslator,
) {
    for (name, value) in origin.headers.iter() {
        if name == header::SET_COOKIE {
            match value.to_str() {
                Ok(raw) => cookies.emit(raw, response, rewriter),
                Err(_) => response.append_header(name.clone(), value.clone()),
            }
        } else if name == header::LOCATION {
            let rewritten = value
                .to_str()
                .ok()
                .and_then(|v| HeaderValue::from_str(&rewriter.to_proxy(v)).ok())
                .unwrap_or_else(|| value.clone());
            response.append_header(name.clone(), rewritten);
        } else {
            response.append_header(name.clone(), value.clone());
        }
    }
}

/// Map the origin's content headers onto the client response.
pub fn map_response_content_headers(origin: &InboundResponse, response: &mut OutboundResponse) {
    for (name, value) in origin.content_headers.iter() {
        response.append_header(name.clone(), value.clone());
    }
}
