use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Stale buckets are swept once every this many checks.
const CLEANUP_EVERY_REQUESTS: u64 = 512;

/// Per-key token bucket.
#[derive(Clone)]
pub struct RateLimitBucket {
    pub remaining: u32,
    pub last_refill: Instant,
}

/// Token-bucket rate limiter keyed by remote IP. Cloning shares the buckets.
#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    buckets: Arc<DashMap<String, RateLimitBucket>>,
    requests_seen: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            buckets: Arc::new(DashMap::new()),
            requests_seen: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Number of keys currently holding a bucket.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Take one token for `key`. Returns the tokens left, or the number of
    /// seconds to wait when the bucket is empty.
    pub fn check(&self, key: &str) -> Result<u32, u64> {
        let capacity = self.config.capacity;
        let window = self.config.window_secs.max(1);
        let now = Instant::now();

        let decision = {
            let mut entry = self
                .buckets
                .entry(key.to_string())
                .or_insert_with(|| RateLimitBucket {
                    remaining: capacity,
                    last_refill: now,
                });
            let bucket = entry.value_mut();

            // Refill tokens based on elapsed time
            let elapsed = now.duration_since(bucket.last_refill).as_secs();
            if elapsed >= window {
                bucket.remaining = capacity;
                bucket.last_refill = now;
            } else if elapsed > 0 {
                let refill = ((elapsed as f64 / window as f64) * capacity as f64) as u32;
                if refill > 0 {
                    bucket.remaining = (bucket.remaining + refill).min(capacity);
                    bucket.last_refill = now;
                }
            }

            if bucket.remaining == 0 {
                let secs_until_refill =
                    window.saturating_sub(now.duration_since(bucket.last_refill).as_secs());
                Err(secs_until_refill.max(1))
            } else {
                bucket.remaining -= 1;
                Ok(bucket.remaining)
            }
        };

        self.cleanup_if_needed(now, window);
        decision
    }

    /// Drop buckets idle for longer than a full window. Such a bucket would
    /// be refilled to capacity on its next use, so forgetting it is lossless.
    fn cleanup_if_needed(&self, now: Instant, window: u64) {
        let seen = self.requests_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % CLEANUP_EVERY_REQUESTS != 0 {
            return;
        }
        let stale_after = Duration::from_secs(window);
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) <= stale_after);
    }
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anon".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);

    let remaining = match limiter.check(&key) {
        Ok(remaining) => remaining,
        Err(retry_after) => {
            tracing::warn!(limiter = limiter.name, %key, retry_after, "rate limit exceeded");
            return AppError::RateLimited { retry_after }.into_response();
        }
    };

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.capacity()));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    // Reset timestamp: seconds until next full refill
    let reset = chrono::Utc::now().timestamp() + limiter.config.window_secs as i64;
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(
            "test",
            RateLimitConfig {
                capacity,
                window_secs,
            },
        )
    }

    #[tokio::test]
    async fn test_exhausts_then_rejects() {
        let limiter = limiter(2, 60);
        assert_eq!(limiter.check("a"), Ok(1));
        assert_eq!(limiter.check("a"), Ok(0));
        assert!(limiter.check("a").is_err());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_refill_after_window() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("a").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_down() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("a").is_ok());
        tokio::time::advance(Duration::from_secs(20)).await;
        let retry = limiter.check("a").unwrap_err();
        assert!(retry <= 40 && retry >= 1, "retry was {retry}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_buckets_are_swept() {
        let limiter = limiter(5, 60);
        for i in 0..CLEANUP_EVERY_REQUESTS - 1 {
            assert!(limiter.check(&format!("10.0.0.{i}")).is_ok());
        }
        assert_eq!(limiter.tracked_keys(), (CLEANUP_EVERY_REQUESTS - 1) as usize);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(limiter.check("192.168.1.1").is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_active_buckets() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("busy").is_ok());
        for i in 0..CLEANUP_EVERY_REQUESTS - 1 {
            let _ = limiter.check(&format!("k{i}"));
        }
        assert!(limiter.tracked_keys() >= 1);
        assert!(limiter.check("busy").is_err());
    }

    #[tokio::test]
    async fn test_clones_share_buckets() {
        let limiter = limiter(1, 60);
        let other = limiter.clone();
        assert!(limiter.check("a").is_ok());
        assert!(other.check("a").is_err());
    }
}
