use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::models::HealthResponse;
use crate::store::Store;

pub async fn health_check(
    State(store): State<Arc<dyn Store>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match store.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "connected".to_string()),
        Err(e) => (
            "unhealthy",
            StatusCode::SERVICE_UNAVAILABLE,
            format!("error: {}", e),
        ),
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }),
    )
}
