//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/failure_log.rs (outer failure boundary)
//!     → request.rs (axum request → InboundRequest)
//!     → [ContextMapper]
//!     → response.rs (OutboundResponse → axum response)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::FailureReport;
pub use server::{HttpServer, StartupError};
