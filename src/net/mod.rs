//! Origin transport subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest
//!     → client.rs (OriginClient, reqwest-backed)
//!     → forward_proxy.rs (optional upstream proxy selection)
//!     → origin
//!     → InboundResponse (fully buffered)
//! ```
//!
//! # Design Decisions
//! - Redirects and cookies are never absorbed by the client; the mapper must
//!   see them raw
//! - One pooled client is shared by every request

pub mod client;
pub mod forward_proxy;

pub use client::{ClientOptions, OriginClient, ReqwestOriginClient, TransportError};
pub use forward_proxy::ForwardProxyOptions;
