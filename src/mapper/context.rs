//! The ContextMapper orchestrator.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → build outbound request (uri, headers, Host, body)
//!     → OriginClient::send            (cancellable)
//!     → status, general headers, content headers
//!     → content pipeline               (only for a positive declared length)
//!     → OutboundResponse
//! ```
//!
//! # Design Decisions
//! - The mapper itself holds only immutable configuration, the shared client
//!   and the hooks. Everything that belongs to one request lives in locals of
//!   [`ContextMapper::invoke`], so one mapper serves any number of concurrent
//!   requests
//! - The target is a required constructor argument; there is no fallback
//! - Nothing is retried and no failure is turned into a synthetic response

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Uri};
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::mapper::content::{map_request_body, map_response_body};
use crate::mapper::cookies::{CookieStrategy, CookieTranslator};
use crate::mapper::error::MapperError;
use crate::mapper::headers::{
    map_request_headers, map_response_content_headers, map_response_headers, HeaderExclusionSet,
};
use crate::mapper::hooks::{DefaultHooks, MapperHooks, RequestContext};
use crate::mapper::identity::{Identity, TargetIdentity, UrlRewriter};
use crate::mapper::message::{declares_body, InboundRequest, InboundResponse, OutboundRequest, OutboundResponse};
use crate::net::client::OriginClient;

/// Knobs of the mapping pipeline.
#[derive(Debug, Clone)]
pub struct MapperSettings {
    /// Parse and re-serialize HTML responses. Off means byte-for-byte copy.
    pub load_html: bool,
    pub cookie_strategy: CookieStrategy,
    pub rewrite_cookie_domain: bool,
    pub excluded_headers: HeaderExclusionSet,
    pub max_request_body_bytes: usize,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            load_html: true,
            cookie_strategy: CookieStrategy::Native,
            rewrite_cookie_domain: true,
            excluded_headers: HeaderExclusionSet::default(),
            max_request_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Maps client requests onto one origin and the origin's answers back.
pub struct ContextMapper<C> {
    target: TargetIdentity,
    client: C,
    hooks: Arc<dyn MapperHooks>,
    settings: MapperSettings,
    cookies: CookieTranslator,
}

impl<C: OriginClient> ContextMapper<C> {
    pub fn new(target: TargetIdentity, client: C) -> Self {
        let settings = MapperSettings::default();
        Self {
            target,
            client,
            hooks: Arc::new(DefaultHooks),
            cookies: CookieTranslator::new(settings.cookie_strategy, settings.rewrite_cookie_domain),
            settings,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn MapperHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_settings(mut self, settings: MapperSettings) -> Self {
        self.cookies = CookieTranslator::new(settings.cookie_strategy, settings.rewrite_cookie_domain);
        self.settings = settings;
        self
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Map one request through the origin and back.
    ///
    /// Firing `cancel` aborts whichever await is in progress. Buffered bodies
    /// are dropped and no response is produced.
    pub async fn invoke(
        &self,
        inbound: InboundRequest,
        cancel: CancellationToken,
    ) -> Result<OutboundResponse, MapperError> {
        let InboundRequest {
            method,
            scheme,
            host,
            path,
            query,
            headers,
            body,
        } = inbound;

        let rewriter = UrlRewriter::new(Identity::new(scheme, host), self.target.clone());
        let ctx = RequestContext {
            method,
            path: &path,
            query: query.as_deref(),
            rewriter: &rewriter,
        };

        let outbound = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MapperError::Cancelled),
            built = self.build_outbound_request(&headers, body, &ctx) => built?,
        };

        tracing::debug!(
            method = %outbound.method,
            uri = %outbound.uri,
            body_bytes = outbound.content_length().unwrap_or(0),
            "Sending outbound request"
        );

        let origin = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MapperError::Cancelled),
            sent = self.client.send(outbound) => sent?,
        };

        self.map_response(&origin, &ctx)
    }

    async fn build_outbound_request(
        &self,
        inbound_headers: &HeaderMap,
        body: Body,
        ctx: &RequestContext<'_>,
    ) -> Result<OutboundRequest, MapperError> {
        let uri = outbound_uri(ctx.rewriter.target(), ctx.path, ctx.query)?;
        let mut outbound = OutboundRequest::new(ctx.method.clone(), uri);

        outbound.headers = map_request_headers(
            inbound_headers,
            &self.settings.excluded_headers,
            self.hooks.as_ref(),
            ctx,
        );

        if let Some(authority) = outbound.uri.authority() {
            let host = HeaderValue::from_str(authority.as_str())
                .map_err(|e| MapperError::Uri(e.to_string()))?;
            outbound.headers.insert(header::HOST, host);
        }

        if declares_body(inbound_headers) {
            map_request_body(
                inbound_headers,
                body,
                &mut outbound,
                ctx,
                self.hooks.as_ref(),
                self.settings.max_request_body_bytes,
            )
            .await?;
        }

        Ok(outbound)
    }

    fn map_response(
        &self,
        origin: &InboundResponse,
        ctx: &RequestContext<'_>,
    ) -> Result<OutboundResponse, MapperError> {
        let mut response = OutboundResponse::new();
        response.status = origin.status;

        map_response_headers(origin, &mut response, ctx.rewriter, &self.cookies);
        map_response_content_headers(origin, &mut response);

        // A HEAD answer declares the GET length but never carries a body
        if ctx.method != Method::HEAD && origin.declared_content_length() > 0 {
            map_response_body(origin, &mut response, ctx, self.hooks.as_ref(), self.settings.load_html)?;
        }

        Ok(response)
    }
}

/// Target origin + inbound path + re-serialized query.
fn outbound_uri(target: &TargetIdentity, path: &str, query: Option<&str>) -> Result<Uri, MapperError> {
    let path = if path.starts_with('/') { path.to_string() } else { format!("/{}", path) };

    let mut uri = format!("{}{}", target.origin(), path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let normalized = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form_urlencoded::parse(query.as_bytes()))
            .finish();
        uri.push('?');
        uri.push_str(&normalized);
    }

    uri.parse::<Uri>().map_err(|e| MapperError::Uri(format!("{}: {}", uri, e)))
}
