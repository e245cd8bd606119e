//! Per-client token bucket rate limiting

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};
use tokio::sync::Mutex;

use super::client_ip;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

/// Shared limiter keyed by client address; bursts up to twice the rate
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rate = requests_per_second.max(1) as f64;
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            burst: rate * 2.0,
        }
    }

    /// Take one token for `key`
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst,
            refreshed: now,
        });

        let elapsed = now.saturating_duration_since(bucket.refreshed).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.refreshed = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle for longer than `idle`
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, b| b.refreshed.elapsed() < idle);
        before - buckets.len()
    }

    /// Periodically evict idle buckets for the life of the process
    pub fn spawn_eviction(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_idle(every).await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle rate limit buckets");
                }
            }
        })
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    if !limiter.check(&key).await {
        tracing::warn!(client = %key, "Rate limit exceeded");
        let mut response = ApiError::TooManyRequests.into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        return response;
    }

    next.run(request).await
}
