//! Correlation-id propagation.
//!
//! Runs outermost: creates the fresh per-request context, reuses a
//! caller-supplied correlation id when present (distributed-tracing
//! chains), echoes the id back on the response, and logs failed (5xx)
//! responses with their attached error detail. Generation is infallible;
//! this layer has no error path of its own.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use clin_core::RequestContext;
use uuid::Uuid;

use crate::error::ErrorDetail;

/// Canonical correlation header, echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Accepted inbound alias.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

fn inbound_id(req: &Request) -> Option<String> {
    [REQUEST_ID_HEADER, CORRELATION_ID_HEADER]
        .iter()
        .find_map(|name| req.headers().get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn propagate_correlation_id(mut req: Request, next: Next) -> Response {
    let correlation_id = inbound_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());

    // A fresh context per request; downstream layers fill it in.
    req.extensions_mut()
        .insert(RequestContext::new(correlation_id.clone()));

    tracing::debug!(correlation_id = %correlation_id, method = %req.method(), path = %req.uri().path(), "request received");

    let mut res = next.run(req).await;

    if res.status().is_server_error() {
        let detail = res
            .extensions()
            .get::<ErrorDetail>()
            .map(|d| d.0.as_str())
            .unwrap_or("no detail attached");
        tracing::error!(
            correlation_id = %correlation_id,
            status = %res.status(),
            error = detail,
            "request failed"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    res
}
