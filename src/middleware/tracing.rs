//! Per-request access log

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::client_ip;

/// Log method, path, client and outcome; level follows the status class
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_ip(request.headers());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        500..=599 => tracing::error!(
            %method, %path, client = ?client, status, elapsed_ms, "Request failed"
        ),
        400..=499 => tracing::warn!(
            %method, %path, client = ?client, status, elapsed_ms, "Request rejected"
        ),
        _ => tracing::info!(
            %method, %path, client = ?client, status, elapsed_ms, "Request served"
        ),
    }

    response
}
