use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::dispatch::MessageDispatcher;
use crate::gateway::ChatGateway;
use crate::middleware::rate_limit::RateLimiter;
use crate::readiness::SessionTracker;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: MessageDispatcher,
    pub gateway: Arc<dyn ChatGateway>,
    pub tracker: Arc<SessionTracker>,
    pub api_limiter: RateLimiter,
    pub send_limiter: RateLimiter,
    pub started_at: Instant,
    /// Length of the configured token, reported by the debug endpoint.
    pub token_len: usize,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        tracker: Arc<SessionTracker>,
        dispatch_timeout: Duration,
        api_limit: RateLimitConfig,
        send_limit: RateLimitConfig,
        token_len: usize,
    ) -> Self {
        Self {
            dispatcher: MessageDispatcher::new(gateway.clone(), tracker.clone(), dispatch_timeout),
            gateway,
            tracker,
            api_limiter: RateLimiter::new("api", api_limit),
            send_limiter: RateLimiter::new("send", send_limit),
            started_at: Instant::now(),
            token_len,
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
