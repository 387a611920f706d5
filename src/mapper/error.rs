//! Failure taxonomy for the mapping pipeline.

use thiserror::Error;

use crate::net::client::TransportError;

/// Errors that escape a single request mapping.
///
/// Nothing inside the pipeline recovers from these; they propagate to the
/// host surface, which logs them and answers with a bare failure response.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The pipeline was driven in a way it does not support.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The origin call failed. Never retried or translated.
    #[error("origin request failed: {0}")]
    Transport(#[from] TransportError),

    /// The inbound request's cancellation signal fired.
    #[error("request cancelled by client")]
    Cancelled,

    /// Reading the inbound request body failed or exceeded the limit.
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    /// Decompressing a gzip body failed.
    #[error("failed to decompress response body: {0}")]
    Decompress(#[from] std::io::Error),

    /// An HTML body was not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The outbound URI could not be assembled.
    #[error("invalid outbound uri: {0}")]
    Uri(String),
}

impl MapperError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MapperError::InvalidOperation(_) => "invalid_operation",
            MapperError::Transport(_) => "transport",
            MapperError::Cancelled => "cancelled",
            MapperError::RequestBody(_) => "request_body",
            MapperError::Decompress(_) => "decompress",
            MapperError::InvalidUtf8(_) => "invalid_utf8",
            MapperError::Uri(_) => "uri",
        }
    }
}
