use super::ip::extract_ip_from_headers;
use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Per-IP sliding window limiter.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Records the request if `ip` is under its limit, else reports how long to wait.
    pub async fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let timestamps = requests.entry(ip).or_default();

        // Keep timestamps whose age cannot be computed (clock skew); dropping them would loosen the limit.
        timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = match now.checked_duration_since(oldest) {
                Some(elapsed) => self.window.saturating_sub(elapsed),
                None => Duration::from_secs(1),
            };
            return Err(AppError::RateLimited { retry_after_seconds: retry_after.as_secs().max(1) });
        }

        timestamps.push(now);
        Ok(())
    }

    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));
            !timestamps.is_empty()
        });
    }
}

/// Named limits for groups of endpoints, on top of the global limit.
#[derive(Clone, Default)]
pub struct EndpointRateLimiter {
    limiters: Arc<HashMap<&'static str, RateLimiter>>,
}

pub const DISTRIBUTION: &str = "distribution";
pub const WRITES: &str = "writes";

impl EndpointRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: impl IntoIterator<Item = (&'static str, usize, u64)>) -> Self {
        let limiters = limits
            .into_iter()
            .map(|(name, max_requests, window_seconds)| (name, RateLimiter::new(max_requests, window_seconds)))
            .collect();
        Self { limiters: Arc::new(limiters) }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::with_limits([(DISTRIBUTION, cfg.distribution_per_minute, 60), (WRITES, cfg.writes_per_minute, 60)])
    }

    pub async fn check_endpoint_limit(&self, group: &str, ip: IpAddr) -> Result<(), AppError> {
        match self.limiters.get(group) {
            Some(limiter) => limiter.check(ip).await,
            None => Ok(()),
        }
    }

    pub async fn cleanup_all(&self) {
        for limiter in self.limiters.values() {
            limiter.cleanup_old_entries().await;
        }
    }
}

/// Which endpoint group a request counts against, if any.
pub fn endpoint_group(method: &Method, path: &str) -> Option<&'static str> {
    if *method == Method::POST && path == "/api/books/distribution" {
        return Some(DISTRIBUTION);
    }
    let writes = matches!(*method, Method::POST | Method::PATCH | Method::PUT | Method::DELETE);
    (writes && path.starts_with("/api/")).then_some(WRITES)
}

/// Applies the global limit, then the limit of the request's endpoint group.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let ip = extract_ip_from_headers(req.headers(), remote_ip);

    if let Err(e) = state.global_limiter.check(ip).await {
        return e.into_response();
    }
    if let Some(group) = endpoint_group(req.method(), req.uri().path()) {
        if let Err(e) = state.rate_limiter.check_endpoint_limit(group, ip).await {
            tracing::warn!(%ip, group, "Endpoint rate limit hit");
            return e.into_response();
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_blocks_after_max_and_recovers() {
        let limiter = RateLimiter::new(3, 1);
        let ip = IpAddr::from([127, 0, 0, 1]);

        for _ in 0..3 {
            assert!(limiter.check(ip).await.is_ok());
        }
        assert!(matches!(limiter.check(ip).await, Err(AppError::RateLimited { .. })));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check(ip).await.is_ok());
    }

    #[tokio::test]
    async fn ips_are_counted_separately() {
        let limiter = RateLimiter::new(1, 60);
        let a = IpAddr::from([10, 0, 0, 1]);
        let b = IpAddr::from([10, 0, 0, 2]);

        assert!(limiter.check(a).await.is_ok());
        assert!(limiter.check(b).await.is_ok());
        assert!(limiter.check(a).await.is_err());
        assert!(limiter.check(b).await.is_err());
    }

    #[tokio::test]
    async fn unknown_group_is_unlimited() {
        let limiter = EndpointRateLimiter::with_limits([(DISTRIBUTION, 1, 60)]);
        let ip = IpAddr::from([127, 0, 0, 1]);
        assert!(limiter.check_endpoint_limit("other", ip).await.is_ok());
        assert!(limiter.check_endpoint_limit("other", ip).await.is_ok());
        assert!(limiter.check_endpoint_limit(DISTRIBUTION, ip).await.is_ok());
        assert!(limiter.check_endpoint_limit(DISTRIBUTION, ip).await.is_err());
    }

    #[test]
    fn groups_by_method_and_path() {
        assert_eq!(endpoint_group(&Method::POST, "/api/books/distribution"), Some(DISTRIBUTION));
        assert_eq!(endpoint_group(&Method::PATCH, "/api/books/abc"), Some(WRITES));
        assert_eq!(endpoint_group(&Method::DELETE, "/api/years/1"), Some(WRITES));
        assert_eq!(endpoint_group(&Method::GET, "/api/books"), None);
        assert_eq!(endpoint_group(&Method::POST, "/healthz"), None);
    }
}
