//! Content-type driven body mapping.
//!
//! # Responsibilities
//! - Pick a body mapper from the declared content type
//! - Re-encode form bodies after the form hook has run
//! - Copy everything else byte for byte, through the JSON/generic hooks
//!
//! # Design Decisions
//! - Request priority: form → JSON → generic
//! - Response priority: HTML → JSON → generic
//! - A `304 Not Modified` never gets a body written
//! - Bodies are buffered in full; nothing streams within one request

use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use bytes::Bytes;
use url::form_urlencoded;

use crate::mapper::error::MapperError;
use crate::mapper::hooks::{FormFields, MapperHooks, RequestContext};
use crate::mapper::html::map_html_response;
use crate::mapper::message::{declares_body, InboundResponse, OutboundRequest, OutboundResponse};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";
const JSON: &str = "application/json";
const HTML: &str = "text/html";

/// Body mapper selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBodyKind {
    UrlEncodedForm,
    MultipartForm,
    Json,
    Generic,
}

/// Body mapper selected for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBodyKind {
    Html,
    Json,
    Generic,
}

pub fn classify_request(content_type: Option<&str>) -> RequestBodyKind {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.starts_with(FORM_URLENCODED) {
        RequestBodyKind::UrlEncodedForm
    } else if content_type.starts_with(MULTIPART_FORM) {
        RequestBodyKind::MultipartForm
    } else if content_type.contains(JSON) {
        RequestBodyKind::Json
    } else {
        RequestBodyKind::Generic
    }
}

pub fn classify_response<'a>(content_types: impl IntoIterator<Item = &'a str>) -> ResponseBodyKind {
    let content_types: Vec<String> = content_types
        .into_iter()
        .map(|ct| ct.to_ascii_lowercase())
        .collect();

    if content_types.iter().any(|ct| ct.contains(HTML)) {
        ResponseBodyKind::Html
    } else if content_types.iter().any(|ct| ct.contains(JSON)) {
        ResponseBodyKind::Json
    } else {
        ResponseBodyKind::Generic
    }
}

/// Map the inbound request body onto the outbound request.
///
/// Fails with `InvalidOperation` when the inbound request declares no body.
pub async fn map_request_body(
    inbound_headers: &HeaderMap,
    body: Body,
    outbound: &mut OutboundRequest,
    ctx: &RequestContext<'_>,
    hooks: &dyn MapperHooks,
    limit: usize,
) -> Result<(), MapperError> {
    if !declares_body(inbound_headers) {
        return Err(MapperError::InvalidOperation(format!(
            "tried to map a request body for a {} request that declares none",
            ctx.method
        )));
    }

    let content_type = inbound_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    match classify_request(content_type) {
        RequestBodyKind::UrlEncodedForm => {
            let bytes = read_body(body, limit).await?;
            let fields = form_urlencoded::parse(&bytes).into_owned().collect();
            write_form(fields, outbound, ctx, hooks);
        }
        RequestBodyKind::MultipartForm => {
            let fields = read_multipart(inbound_headers, body).await?;
            write_form(fields, outbound, ctx, hooks);
        }
        RequestBodyKind::Json => {
            let bytes = read_body(body, limit).await?;
            outbound.set_body(hooks.map_json_request(ctx, bytes));
        }
        RequestBodyKind::Generic => {
            let bytes = read_body(body, limit).await?;
            outbound.set_body(hooks.map_generic_request(ctx, bytes));
        }
    }

    Ok(())
}

/// Map the buffered origin body onto the client response.
pub fn map_response_body(
    origin: &InboundResponse,
    response: &mut OutboundResponse,
    ctx: &RequestContext<'_>,
    hooks: &dyn MapperHooks,
    load_html: bool,
) -> Result<(), MapperError> {
    if origin.status == StatusCode::NOT_MODIFIED {
        return Ok(());
    }

    match classify_response(origin.content_types()) {
        ResponseBodyKind::Html => map_html_response(origin, response, ctx, hooks, load_html)?,
        ResponseBodyKind::Json => {
            let body = hooks.map_json_response(ctx, origin.status, origin.body.clone());
            write_mapped(origin, body, response);
        }
        ResponseBodyKind::Generic => {
            let body = hooks.map_generic_response(ctx, origin.status, origin.body.clone());
            write_mapped(origin, body, response);
        }
    }

    Ok(())
}

/// Byte-for-byte copy. Skipped entirely for `304 Not Modified`.
pub fn write_generic(status: StatusCode, body: &[u8], response: &mut OutboundResponse) {
    if status == StatusCode::NOT_MODIFIED {
        return;
    }
    response.write(body);
}

/// Write a hook's output, correcting `Content-Length` if the hook resized it.
fn write_mapped(origin: &InboundResponse, body: Bytes, response: &mut OutboundResponse) {
    if body.len() != origin.body.len() {
        response.set_content_length(body.len() as u64);
    }
    write_generic(origin.status, &body, response);
}

fn write_form(
    mut fields: FormFields,
    outbound: &mut OutboundRequest,
    ctx: &RequestContext<'_>,
    hooks: &dyn MapperHooks,
) {
    hooks.map_form_fields(ctx, &mut fields);

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish();

    // The body is url-encoded now whatever form encoding came in
    outbound
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
    // Length is only known once encoding is done
    outbound.set_body(Bytes::from(encoded));
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, MapperError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| MapperError::RequestBody(e.to_string()))
}

/// Text fields of a multipart body. File parts are dropped.
async fn read_multipart(headers: &HeaderMap, body: Body) -> Result<FormFields, MapperError> {
    let mut request = Request::new(body);
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| MapperError::RequestBody(e.to_string()))?;

    let mut fields = FormFields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MapperError::RequestBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            tracing::warn!(field = %name, file_name = %file_name, "Dropping multipart file part");
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| MapperError::RequestBody(e.to_string()))?;
        fields.push((name, value));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::hooks::DefaultHooks;
    use crate::mapper::identity::{Identity, UrlRewriter};
    use axum::http::{Method, Uri};

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(
            Identity::new("http", "proxy.local"),
            Identity::parse_target("https://example.com").unwrap(),
        )
    }

    fn headers(content_type: &'static str, length: usize) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length as u64));
        headers
    }

    fn outbound() -> OutboundRequest {
        OutboundRequest::new(Method::POST, Uri::from_static("https://example.com/submit"))
    }

    struct AddField;

    impl MapperHooks for AddField {
        fn map_form_fields(&self, _ctx: &RequestContext<'_>, fields: &mut FormFields) {
            fields.push(("added".into(), "yes please".into()));
        }
    }

    #[test]
    fn test_classify_request() {
        assert_eq!(classify_request(Some("application/x-www-form-urlencoded")), RequestBodyKind::UrlEncodedForm);
        assert_eq!(
            classify_request(Some("multipart/form-data; boundary=X")),
            RequestBodyKind::MultipartForm
        );
        assert_eq!(classify_request(Some("application/json; charset=utf-8")), RequestBodyKind::Json);
        assert_eq!(classify_request(Some("text/plain")), RequestBodyKind::Generic);
        assert_eq!(classify_request(None), RequestBodyKind::Generic);
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(classify_response(["text/html; charset=utf-8"]), ResponseBodyKind::Html);
        assert_eq!(classify_response(["application/json"]), ResponseBodyKind::Json);
        assert_eq!(classify_response(["image/png"]), ResponseBodyKind::Generic);
        assert_eq!(classify_response(Vec::<&str>::new()), ResponseBodyKind::Generic);
    }

    #[tokio::test]
    async fn test_form_reencoded_with_fresh_length() {
        let r = rewriter();
        let ctx = RequestContext { method: Method::POST, path: "/submit", query: None, rewriter: &r };
        let raw = "user=ann+lee&note=a%26b";
        let mut out = outbound();

        map_request_body(
            &headers(FORM_URLENCODED, raw.len()),
            Body::from(raw),
            &mut out,
            &ctx,
            &AddField,
            1024,
        )
        .await
        .unwrap();

        let body = out.body.clone().unwrap();
        assert_eq!(&body[..], b"user=ann+lee&note=a%26b&added=yes+please");
        assert_eq!(
            out.headers.get(header::CONTENT_LENGTH).unwrap(),
            body.len().to_string().as_str()
        );
        assert_eq!(out.headers.get(header::CONTENT_TYPE).unwrap(), FORM_URLENCODED);
    }

    #[tokio::test]
    async fn test_multipart_becomes_urlencoded() {
        let r = rewriter();
        let ctx = RequestContext { method: Method::POST, path: "/upload", query: None, rewriter: &r };
        let raw = "--XyZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
hello world\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
file body\r\n\
--XyZ--\r\n";
        let mut out = outbound();

        map_request_body(
            &headers("multipart/form-data; boundary=XyZ", raw.len()),
            Body::from(raw),
            &mut out,
            &ctx,
            &DefaultHooks,
            1024,
        )
        .await
        .unwrap();

        assert_eq!(&out.body.unwrap()[..], b"title=hello+world");
    }

    #[tokio::test]
    async fn test_generic_body_copied() {
        let r = rewriter();
        let ctx = RequestContext { method: Method::PUT, path: "/blob", query: None, rewriter: &r };
        let mut out = outbound();

        map_request_body(
            &headers("application/octet-stream", 4),
            Body::from(vec![0u8, 1, 2, 3]),
            &mut out,
            &ctx,
            &DefaultHooks,
            1024,
        )
        .await
        .unwrap();

        assert_eq!(&out.body.unwrap()[..], &[0u8, 1, 2, 3]);
        assert_eq!(out.headers.get(header::CONTENT_LENGTH).unwrap(), "4");
    }

    #[tokio::test]
    async fn test_body_without_declaration_is_misuse() {
        let r = rewriter();
        let ctx = RequestContext { method: Method::GET, path: "/", query: None, rewriter: &r };
        let mut out = outbound();

        let err = map_request_body(&HeaderMap::new(), Body::empty(), &mut out, &ctx, &DefaultHooks, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let r = rewriter();
        let ctx = RequestContext { method: Method::POST, path: "/", query: None, rewriter: &r };
        let mut out = outbound();

        let err = map_request_body(
            &headers("text/plain", 10),
            Body::from("0123456789"),
            &mut out,
            &ctx,
            &DefaultHooks,
            4,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MapperError::RequestBody(_)));
    }

    #[test]
    fn test_not_modified_writes_nothing() {
        let mut raw = HeaderMap::new();
        raw.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        raw.insert(header::CONTENT_LENGTH, HeaderValue::from_static("120"));
        let origin = InboundResponse::from_parts(StatusCode::NOT_MODIFIED, raw, Bytes::new());

        let r = rewriter();
        let ctx = RequestContext { method: Method::GET, path: "/", query: None, rewriter: &r };
        let mut response = OutboundResponse::new();
        map_response_body(&origin, &mut response, &ctx, &DefaultHooks, true).unwrap();
        assert!(response.body().is_empty());

        write_generic(StatusCode::NOT_MODIFIED, b"ignored", &mut response);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_json_hook_resize_updates_length() {
        struct Wrap;
        impl MapperHooks for Wrap {
            fn map_json_response(&self, _ctx: &RequestContext<'_>, _status: StatusCode, body: Bytes) -> Bytes {
                let mut wrapped = b"[".to_vec();
                wrapped.extend_from_slice(&body);
                wrapped.push(b']');
                Bytes::from(wrapped)
            }
        }

        let mut raw = HeaderMap::new();
        raw.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        raw.insert(header::CONTENT_LENGTH, HeaderValue::from_static("7"));
        let origin = InboundResponse::from_parts(StatusCode::OK, raw, Bytes::from_static(b"{\"a\":1}"));

        let r = rewriter();
        let ctx = RequestContext { method: Method::GET, path: "/", query: None, rewriter: &r };
        let mut response = OutboundResponse::new();
        response.set_content_length(7);
        map_response_body(&origin, &mut response, &ctx, &Wrap, true).unwrap();

        assert_eq!(response.body(), b"[{\"a\":1}]");
        assert_eq!(response.content_length(), Some(9));
    }
}
