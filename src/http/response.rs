//! Response handling.
//!
//! # Responsibilities
//! - Turn the mapper's `OutboundResponse` into an axum response
//! - Turn an escaped `MapperError` into a bare failure response
//!
//! # Design Decisions
//! - Hop-by-hop headers stripped; the server frames the body itself
//! - Failures carry a `FailureReport` extension for the logging boundary
//!   instead of a custom error page

use axum::{
    body::Body,
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};

use crate::mapper::error::MapperError;
use crate::mapper::message::OutboundResponse;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// What the failure boundary needs to log an escaped error.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub kind: &'static str,
    pub message: String,
}

pub fn into_axum_response(response: OutboundResponse) -> Response {
    let (status, headers, body) = response.into_parts();

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    for (name, value) in headers.iter() {
        if !is_hop_by_hop(name) {
            out.headers_mut().append(name.clone(), value.clone());
        }
    }
    out
}

impl IntoResponse for MapperError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        // Nobody is listening for a cancelled request
        if !matches!(self, MapperError::Cancelled) {
            response.extensions_mut().insert(FailureReport {
                kind: self.kind(),
                message: self.to_string(),
            });
        }
        response
    }
}
