//! Outer failure boundary.
//! Logs failures that escaped the mapping pipeline and lets the failure
//! response continue to the client unchanged.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::http::request::request_id;
use crate::http::response::FailureReport;
use crate::observability::metrics;

pub async fn log_failures(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let id = request_id(req.headers()).to_string();

    let response = next.run(req).await;

    if let Some(report) = response.extensions().get::<FailureReport>() {
        error!(
            request_id = %id,
            method = %method,
            path = %path,
            kind = report.kind,
            error = %report.message,
            "Request mapping failed"
        );
        metrics::record_failure(report.kind);
    }

    response
}
