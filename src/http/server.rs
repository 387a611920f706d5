//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all mapper route
//! - Wire up middleware (request ID, tracing, failure logging)
//! - Build the mapper and origin client from configuration
//! - Serve until shutdown, draining in-flight requests

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::middleware::log_failures;
use crate::http::request::{inbound_request, request_id, UuidRequestId};
use crate::http::response::into_axum_response;
use crate::lifecycle::Shutdown;
use crate::mapper::context::{ContextMapper, MapperSettings};
use crate::mapper::cookies::CookieStrategy;
use crate::mapper::headers::HeaderExclusionSet;
use crate::mapper::hooks::{DefaultHooks, MapperHooks, TitleRewriter};
use crate::mapper::identity::{Identity, IdentityError};
use crate::net::client::{ClientOptions, OriginClient, ReqwestOriginClient, TransportError};
use crate::observability::metrics;

/// Errors raised while assembling the server from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid target: {0}")]
    Target(#[from] IdentityError),

    #[error("failed to build origin client: {0}")]
    Client(#[from] TransportError),
}

/// Application state injected into handlers.
pub struct AppState<C> {
    pub mapper: Arc<ContextMapper<C>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            mapper: self.mapper.clone(),
        }
    }
}

/// HTTP server fronting one origin.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server around an already-built mapper.
    pub fn new<C: OriginClient>(mapper: ContextMapper<C>) -> Self {
        let state = AppState {
            mapper: Arc::new(mapper),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the origin client, hooks and mapper from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, StartupError> {
        let target = Identity::parse_target(&config.target.url)?;

        let client = ReqwestOriginClient::new(&ClientOptions {
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            forward_proxy: config.forward_proxy.clone(),
        })?;

        let hooks: Arc<dyn MapperHooks> = match &config.mapper.html_title {
            Some(title) => Arc::new(TitleRewriter::new(title.clone())),
            None => Arc::new(DefaultHooks),
        };

        let mapper = ContextMapper::new(target, client)
            .with_settings(mapper_settings(config))
            .with_hooks(hooks);

        Ok(Self::new(mapper))
    }

    fn build_router<C: OriginClient>(state: AppState<C>) -> Router {
        Router::new()
            .route("/", any(map_request::<C>))
            .route("/{*path}", any(map_request::<C>))
            .with_state(state)
            .layer(axum::middleware::from_fn(log_failures))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %request_id(req.headers()),
                            method = %req.method(),
                            path = %req.uri().path(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn mapper_settings(config: &ProxyConfig) -> MapperSettings {
    let mapper = &config.mapper;
    MapperSettings {
        load_html: mapper.load_html,
        cookie_strategy: if mapper.disable_set_cookie_encoding {
            CookieStrategy::Manual
        } else {
            CookieStrategy::Native
        },
        rewrite_cookie_domain: mapper.rewrite_cookie_domain,
        excluded_headers: HeaderExclusionSet::with_extra(&mapper.excluded_headers),
        max_request_body_bytes: mapper.max_request_body_bytes,
    }
}

/// Catch-all handler: every request goes through the mapper.
async fn map_request<C: OriginClient>(State(state): State<AppState<C>>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let inbound = inbound_request(request);

    // Dropping the handler (client went away) cancels the origin call
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.mapper.invoke(inbound, cancel).await {
        Ok(response) => {
            let status = response.status;
            tracing::debug!(
                status = status.as_u16(),
                target = %state.mapper.target().origin(),
                bytes = response.body().len(),
                "Mapped response"
            );
            metrics::record_request(method.as_str(), status.as_u16(), start);
            into_axum_response(response)
        }
        Err(e) => {
            let response = e.into_response();
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
            response
        }
    }
}
