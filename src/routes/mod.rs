//! Route definitions and router assembly

mod bookings;
mod catalog;
mod payments;
mod trips;

pub use bookings::booking_routes;
pub use catalog::catalog_routes;
pub use payments::payment_routes;
pub use trips::trip_routes;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::health_check;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;
use crate::websocket;

/// Cross-cutting HTTP settings
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Comma-separated; unset means permissive
    pub cors_allowed_origins: Option<String>,
    /// Add HSTS to responses
    pub hsts: bool,
}

impl HttpOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            hsts: config.environment.is_production_like(),
        }
    }
}

/// Full application router with middleware applied
pub fn build_router(state: AppState, limiter: RateLimiter, options: &HttpOptions) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(catalog_routes())
        .merge(trip_routes())
        .merge(booking_routes())
        .merge(payment_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit,
        ))
        .layer(configure_cors(options.cors_allowed_origins.as_deref()));

    if options.hsts {
        router.layer(middleware::hsts_layer())
    } else {
        router
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}

fn configure_cors(allowed: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
