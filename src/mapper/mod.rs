//! Bidirectional request/response mapping between a proxy identity and an
//! origin.
//!
//! # Data Flow
//! ```text
//! client ──▶ InboundRequest
//!              → headers.rs  (exclusions, Referer/Origin rewrite, hook)
//!              → content.rs  (form / JSON / generic body)
//!            OutboundRequest ──▶ OriginClient ──▶ origin
//!
//! origin ──▶ InboundResponse
//!              → headers.rs  (Location rewrite, content headers)
//!              → cookies.rs  (Set-Cookie re-emission)
//!              → content.rs / html.rs (body)
//!            OutboundResponse ──▶ client
//! ```

pub mod content;
pub mod context;
pub mod cookies;
pub mod error;
pub mod headers;
pub mod hooks;
pub mod html;
pub mod identity;
pub mod message;

pub use context::{ContextMapper, MapperSettings};
pub use cookies::{CookieRecord, CookieStrategy, CookieTranslator};
pub use error::MapperError;
pub use headers::HeaderExclusionSet;
pub use hooks::{DefaultHooks, FormFields, MapperHooks, RequestContext, TitleRewriter};
pub use identity::{Identity, ProxyIdentity, TargetIdentity, UrlRewriter};
pub use message::{InboundRequest, InboundResponse, OutboundRequest, OutboundResponse};
