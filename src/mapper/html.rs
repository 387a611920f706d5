//! HTML response rewriting.
//!
//! ```text
//! buffered body
//!     → gunzip (when Content-Encoding says gzip; header removed)
//!     → UTF-8 decode → entity decode
//!     → parse into a document tree
//!     → MapperHooks::mutate_html
//!     → serialize → fix Content-Length, drop Transfer-Encoding → write
//! ```
//!
//! Everything here is synchronous: the parsed tree is not `Send` and must
//! never be held across an await.

use std::io::Read;

use axum::http::header;
use flate2::read::GzDecoder;
use scraper::node::Text;
use scraper::{Html, Node, Selector};

use crate::mapper::content::write_generic;
use crate::mapper::error::MapperError;
use crate::mapper::hooks::{MapperHooks, RequestContext};
use crate::mapper::message::{InboundResponse, OutboundResponse};

/// Rewrite an HTML origin response onto the client response.
///
/// With `load_html` off, or for an encoding other than gzip, the body is
/// copied unchanged instead.
pub fn map_html_response(
    origin: &InboundResponse,
    response: &mut OutboundResponse,
    ctx: &RequestContext<'_>,
    hooks: &dyn MapperHooks,
    load_html: bool,
) -> Result<(), MapperError> {
    if !load_html {
        write_generic(origin.status, &origin.body, response);
        return Ok(());
    }

    if let Some(encoding) = unsupported_encoding(origin) {
        tracing::debug!(encoding = %encoding, "Cannot inspect HTML with this content encoding, passing through");
        write_generic(origin.status, &origin.body, response);
        return Ok(());
    }

    let raw = if origin.is_gzip() {
        let decompressed = gunzip(&origin.body)?;
        let removed = response.remove_header(&header::CONTENT_ENCODING);
        tracing::info!(
            removed_content_encoding = removed,
            compressed = origin.body.len(),
            decompressed = decompressed.len(),
            "Decompressed gzip body to load HTML"
        );
        decompressed
    } else {
        origin.body.to_vec()
    };

    let text = String::from_utf8(raw)?;
    let decoded = html_escape::decode_html_entities(&text);

    let mut document = Html::parse_document(&decoded);
    hooks.mutate_html(ctx, &mut document);
    let serialized = document.html().into_bytes();

    response.set_content_length(serialized.len() as u64);
    response.remove_header(&header::TRANSFER_ENCODING);
    response.write(&serialized);

    Ok(())
}

/// Replace the children of every element matching `selector` with `text`.
///
/// Returns how many elements were changed.
pub fn set_inner_text(document: &mut Html, selector: &Selector, text: &str) -> usize {
    let ids: Vec<_> = document.select(selector).map(|element| element.id()).collect();

    for id in &ids {
        if let Some(mut node) = document.tree.get_mut(*id) {
            while let Some(mut child) = node.first_child() {
                child.detach();
            }
            node.append(Node::Text(Text { text: text.into() }));
        }
    }

    ids.len()
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// First content coding that is neither gzip nor identity.
fn unsupported_encoding(origin: &InboundResponse) -> Option<String> {
    origin
        .content_headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_ascii_lowercase())
        .find(|v| !v.is_empty() && v != "gzip" && v != "x-gzip" && v != "identity")
}
