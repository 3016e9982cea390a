use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::{EndpointRateLimiter, RateLimiter};

/// Shared state handed to every handler and stateful middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Limit applied to every request per client IP.
    pub global_limiter: RateLimiter,
    /// Tighter limits for the distribution endpoint and other writes.
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let global_limiter = RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_seconds);
        let rate_limiter = EndpointRateLimiter::from_config(&config.rate_limit);
        Self { db, config: Arc::new(config), metrics: Metrics::new(), global_limiter, rate_limiter }
    }
}
