//! HTTP context mapper.
//!
//! Fronts a single origin and maps every request and response between the
//! proxy identity the client sees and the origin's own identity: urls,
//! headers, cookies, and HTML content.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mapper;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mapper::{ContextMapper, MapperHooks, MapperSettings};
