//! The HTTP client collaborator that talks to the origin.
//!
//! # Responsibilities
//! - Send one `OutboundRequest` and buffer the full origin response
//! - Never follow redirects, never keep cookies, never decompress
//! - Route through a forward proxy when one is configured
//!
//! # Design Decisions
//! - `OriginClient` is the seam the mapper is generic over, so tests can
//!   stand in a scripted origin
//! - Timeouts live here and nowhere else in the pipeline

use std::future::Future;
use std::time::Duration;

use reqwest::redirect::Policy;
use thiserror::Error;

use crate::mapper::message::{InboundResponse, OutboundRequest};
use crate::net::forward_proxy::ForwardProxyOptions;

/// Failures raised by the origin transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

/// Sends outbound requests to the origin.
///
/// Implementations must be safe to share across concurrent requests.
pub trait OriginClient: Send + Sync + 'static {
    /// Send the request and return once the whole origin body is read.
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<InboundResponse, TransportError>> + Send;
}

/// Client construction options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub forward_proxy: ForwardProxyOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            forward_proxy: ForwardProxyOptions::default(),
        }
    }
}

/// `OriginClient` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestOriginClient {
    client: reqwest::Client,
}

impl ReqwestOriginClient {
    pub fn new(options: &ClientOptions) -> Result<Self, TransportError> {
        let builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout);

        let fp = &options.forward_proxy;
        let builder = match fp.proxy_url() {
            Some(url) => {
                tracing::info!(host = %fp.host, port = %fp.port, "Using forward proxy");
                builder.proxy(reqwest::Proxy::all(url)?)
            }
            None => {
                tracing::warn!(host = %fp.host, port = %fp.port, "Not using forward proxy");
                builder.no_proxy()
            }
        };

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl OriginClient for ReqwestOriginClient {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let url = reqwest::Url::parse(&request.uri.to_string())
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", request.uri, e)))?;

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(status = %status, bytes = body.len(), "Origin response buffered");
        Ok(InboundResponse::from_parts(status, headers, body))
    }
}
