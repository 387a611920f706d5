//! Customization points of the mapping pipeline.
//!
//! A customizer implements [`MapperHooks`] and overrides only the methods it
//! cares about; every method has a default that keeps the base behavior.

use axum::http::{HeaderName, Method, StatusCode};
use bytes::Bytes;
use scraper::{Html, Selector};

use crate::mapper::headers::default_request_header_value;
use crate::mapper::html::set_inner_text;
use crate::mapper::identity::UrlRewriter;

/// Decoded form fields in submission order. Repeated names are kept.
pub type FormFields = Vec<(String, String)>;

/// What a hook knows about the request being mapped.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub rewriter: &'a UrlRewriter,
}

/// Extension points invoked by the pipeline.
pub trait MapperHooks: Send + Sync {
    /// Map one value of an outbound request header.
    fn map_request_header(&self, ctx: &RequestContext<'_>, name: &HeaderName, value: &str) -> String {
        default_request_header_value(ctx.rewriter, name, value)
    }

    /// Inspect or mutate decoded form fields before they are re-encoded.
    fn map_form_fields(&self, _ctx: &RequestContext<'_>, _fields: &mut FormFields) {}

    fn map_json_request(&self, _ctx: &RequestContext<'_>, body: Bytes) -> Bytes {
        body
    }

    fn map_generic_request(&self, _ctx: &RequestContext<'_>, body: Bytes) -> Bytes {
        body
    }

    fn map_json_response(&self, _ctx: &RequestContext<'_>, _status: StatusCode, body: Bytes) -> Bytes {
        body
    }

    fn map_generic_response(&self, _ctx: &RequestContext<'_>, _status: StatusCode, body: Bytes) -> Bytes {
        body
    }

    /// Mutate a parsed HTML response before it is serialized again.
    fn mutate_html(&self, _ctx: &RequestContext<'_>, _document: &mut Html) {}
}

/// The base behavior with no customization.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl MapperHooks for DefaultHooks {}

/// Replaces the text of every `<title>` element.
#[derive(Debug, Clone)]
pub struct TitleRewriter {
    title: String,
}

impl TitleRewriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

impl MapperHooks for TitleRewriter {
    fn mutate_html(&self, _ctx: &RequestContext<'_>, document: &mut Html) {
        if let Ok(selector) = Selector::parse("title") {
            let replaced = set_inner_text(document, &selector, &self.title);
            tracing::debug!(replaced, "Rewrote title elements");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::identity::Identity;

    #[test]
    fn test_default_hooks_are_identity() {
        let rewriter = UrlRewriter::new(
            Identity::new("http", "proxy.local"),
            Identity::parse_target("https://example.com").unwrap(),
        );
        let ctx = RequestContext {
            method: Method::POST,
            path: "/api",
            query: None,
            rewriter: &rewriter,
        };
        let hooks = DefaultHooks;

        let body = Bytes::from_static(b"{\"a\":1}");
        assert_eq!(hooks.map_json_request(&ctx, body.clone()), body);
        assert_eq!(hooks.map_generic_response(&ctx, StatusCode::OK, body.clone()), body);

        let mut fields = vec![("a".to_string(), "1".to_string())];
        hooks.map_form_fields(&ctx, &mut fields);
        assert_eq!(fields, vec![("a".to_string(), "1".to_string())]);

        let origin = HeaderName::from_static("origin");
        assert_eq!(hooks.map_request_header(&ctx, &origin, "http://proxy.local"), "https://example.com");
    }

    #[test]
    fn test_title_rewriter() {
        let rewriter = UrlRewriter::new(
            Identity::new("http", "proxy.local"),
            Identity::parse_target("https://example.com").unwrap(),
        );
        let ctx = RequestContext {
            method: Method::GET,
            path: "/",
            query: None,
            rewriter: &rewriter,
        };
        let mut doc = Html::parse_document("<html><head><title>Old</title></head><body></body></html>");
        TitleRewriter::new("Hello World!").mutate_html(&ctx, &mut doc);
        assert!(doc.html().contains("<title>Hello World!</title>"));
    }
}
