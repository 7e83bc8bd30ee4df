//! Request tracking.
//!
//! [`track_request`] runs around every route:
//!
//! 1. takes the caller's `X-Correlation-ID`, or mints one when it is missing or
//!    not a UUID
//! 2. stores it as a [`CorrelationId`] extension for handlers
//! 3. runs the request inside an `http_request` span labelled with the matched
//!    route template (`/appointments/:appointmentId`, not the concrete id)
//! 4. logs the outcome and echoes the id on the response
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/appointments/me", get(list_mine))
//!     .layer(axum::middleware::from_fn(track_request));
//! ```

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::extractors::CorrelationId;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Parse a correlation id header value, if present and well formed.
pub(crate) fn parse_correlation_id(value: Option<&HeaderValue>) -> Option<Uuid> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Correlation id, span and completion log for one request.
pub async fn track_request(mut request: Request, next: Next) -> Response {
    let correlation_id = parse_correlation_id(request.headers().get(CORRELATION_ID_HEADER))
        .unwrap_or_else(Uuid::new_v4);
    request.extensions_mut().insert(CorrelationId(correlation_id));

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str)
        .to_owned();
    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        route = %route,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    span.in_scope(|| {
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), elapsed_ms, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), elapsed_ms, "Request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
