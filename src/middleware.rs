//! Access logging middleware.
//!
//! Records the method and request target of every incoming request before
//! handing it on, then logs completion with status and duration inside the
//! same span.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;

use crate::config::ACCESS_LOG_TARGET;

/// Log `METHOD /path?query` for every request.
pub async fn access_log_layer(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let request_target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    tracing::info!(target: ACCESS_LOG_TARGET, "{} {}", method, request_target);

    let span = tracing::info_span!(
        "request",
        method = %method,
        path = %request_target,
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::debug!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}
