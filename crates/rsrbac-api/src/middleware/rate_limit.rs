//! Per-client token bucket rate limiting.
//!
//! Each client key owns a bucket holding up to `requests_per_minute` tokens.
//! Tokens refill continuously in proportion to elapsed time, so a client that
//! drains its bucket regains roughly one request every `60 / rpm` seconds
//! rather than waiting for a fixed window to reset. Refill and consume happen
//! under the bucket's map entry guard, so concurrent requests for the same
//! key never double-spend a token.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::net::SocketAddr;
use tower::{Layer, Service};
use tracing::warn;

use crate::config::RateLimitSettings;
use crate::http::ApiResponse;
use crate::middleware::is_excluded;

/// Shared bucket registry, keyed by client identity.
///
/// The map is injected rather than owned so tests (and a future eviction
/// task) can observe and manipulate bucket state directly. Buckets are never
/// evicted, and `X-Forwarded-For` is attacker-controlled, so the key space is
/// unbounded in this baseline.
pub type BucketMap = DashMap<String, TokenBucket>;

/// A single client's token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// New bucket, full at creation.
    pub fn new(requests_per_minute: u32) -> Self {
        Self::new_at(requests_per_minute, Instant::now())
    }

    /// New bucket with an explicit creation instant, for deterministic tests.
    pub fn new_at(requests_per_minute: u32, now: Instant) -> Self {
        let capacity = requests_per_minute.max(1);
        Self {
            capacity,
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Refill for elapsed time, then try to spend one token.
    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    /// As [`try_consume`](Self::try_consume) with an injected clock reading.
    pub fn try_consume_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refill = elapsed.as_secs_f64() * self.capacity as f64 / 60.0;
        self.tokens = (self.tokens + refill).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> f64 {
        self.tokens
    }
}

/// Tower layer that applies per-client rate limiting.
#[derive(Clone)]
pub struct RateLimitLayer {
    settings: Arc<RateLimitSettings>,
    buckets: Arc<BucketMap>,
}

impl RateLimitLayer {
    pub fn new(settings: RateLimitSettings, buckets: Arc<BucketMap>) -> Self {
        Self {
            settings: Arc::new(settings),
            buckets,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            settings: Arc::clone(&self.settings),
            buckets: Arc::clone(&self.buckets),
        }
    }
}

/// Middleware service produced by [`RateLimitLayer`].
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    settings: Arc<RateLimitSettings>,
    buckets: Arc<BucketMap>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        if !self.settings.enabled || is_excluded(request.uri().path(), &self.settings.exclude_paths)
        {
            return Box::pin(self.inner.call(request));
        }

        let key = client_key(&request);
        let allowed = {
            // Entry guard held across refill and consume keeps the pair atomic
            // per key without a global lock.
            let mut bucket = self
                .buckets
                .entry(key.clone())
                .or_insert_with(|| TokenBucket::new(self.settings.requests_per_minute));
            bucket.try_consume()
        };

        if allowed {
            Box::pin(self.inner.call(request))
        } else {
            warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
            Box::pin(async move {
                Ok(ApiResponse::error("Too many requests. Try again later.", 429).into_response())
            })
        }
    }
}

/// Resolve the client key for bucketing.
///
/// First non-blank entry of `X-Forwarded-For`, then `X-Real-IP`, then the
/// transport peer address. Requests with none of these share one bucket.
fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = header_str(request, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_str(request, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn bucket_starts_full_and_drains() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(3, start);

        assert!(bucket.try_consume_at(start));
        assert!(bucket.try_consume_at(start));
        assert!(bucket.try_consume_at(start));
        assert!(!bucket.try_consume_at(start));
    }

    #[test]
    fn bucket_refills_proportionally() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(60, start);

        for _ in 0..60 {
            assert!(bucket.try_consume_at(start));
        }
        assert!(!bucket.try_consume_at(start));

        // 60 rpm refills one token per second.
        let later = start + Duration::from_secs(1);
        assert!(bucket.try_consume_at(later));
        assert!(!bucket.try_consume_at(later));
    }

    #[test]
    fn refill_never_exceeds_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(5, start);

        let much_later = start + Duration::from_secs(3600);
        assert!(bucket.try_consume_at(much_later));
        assert!((bucket.remaining() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rpm_is_clamped_to_one() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(0, start);
        assert!(bucket.try_consume_at(start));
        assert!(!bucket.try_consume_at(start));
    }

    #[test]
    fn client_key_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_real_ip() {
        let request = Request::builder()
            .header("X-Forwarded-For", "   ")
            .header("X-Real-IP", " 198.51.100.2 ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "198.51.100.2");
    }

    #[test]
    fn client_key_uses_peer_address_last() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "unknown");

        let addr: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "192.0.2.4");
    }
}
