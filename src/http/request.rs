//! Request inspection.
//!
//! # Responsibilities
//! - Attach a request ID (UUID v4) and echo it on the response
//! - Recognize live-update requests by their marker header
//! - Extract client signals from the body or the query string
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Signal extraction never fails a request; callers log and continue

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Uri};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::bridge::signals::{SignalError, Signals, SIGNALS_QUERY_PARAM};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a fresh request ID when the client sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Request ID for logging, `"unknown"` when absent.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// A live-update request carries the marker header with a nonempty value.
pub fn is_live_request(headers: &HeaderMap, marker: &str) -> bool {
    headers
        .get(marker)
        .is_some_and(|value| !value.as_bytes().is_empty())
}

/// Whether signals for `method` travel in the body rather than the query.
pub fn signals_in_body(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Signals from the `datastar` query parameter.
pub fn signals_from_query(uri: &Uri) -> Result<Signals, SignalError> {
    let Some(query) = uri.query() else {
        return Ok(Signals::default());
    };
    match url::form_urlencoded::parse(query.as_bytes()).find(|(key, _)| key == SIGNALS_QUERY_PARAM) {
        Some((_, value)) => Signals::from_json(value.as_bytes()),
        None => Ok(Signals::default()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("reading request body: {0}")]
    Body(#[from] axum::Error),

    #[error(transparent)]
    Signals(#[from] SignalError),
}

/// Signals for a live-update request, read from wherever `method` puts them.
pub async fn extract_signals(
    method: &Method,
    uri: &Uri,
    body: Body,
    limit: usize,
) -> Result<Signals, ExtractError> {
    if signals_in_body(method) {
        let bytes = to_bytes(body, limit).await?;
        Ok(Signals::from_json(&bytes)?)
    } else {
        Ok(signals_from_query(uri)?)
    }
}
