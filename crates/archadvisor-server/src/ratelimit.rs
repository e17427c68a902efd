//! Per-IP submission limits and request logging.
//!
//! Only run submission is limited. Each client IP gets a bucket of
//! `runs_per_window` submissions that refills evenly across the window.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Limiter
// ─────────────────────────────────────────────────────────────────────────────

/// Keyed limiter over client IPs.
pub struct RunLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
}

impl RunLimiter {
    /// Allow `runs` submissions per `window` per IP.
    pub fn new(runs: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(runs).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
        }
    }

    /// Take one submission for `ip`. On refusal, returns how long until the
    /// next one is allowed, in whole seconds (at least 1).
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs_f64().ceil().max(1.0) as u64
        })
    }

    /// Forget IPs whose buckets have fully refilled.
    pub fn housekeep(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// IPs currently tracked.
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

/// Client address from the connection, or the unspecified address when the
/// router runs without connect info (as in route tests).
pub fn client_ip(request: &Request<Body>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Rejects submissions beyond the per-IP quota with 429 and `Retry-After`.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    if !state.config.rate_limiting {
        return Ok(next.run(request).await);
    }

    let ip = client_ip(&request);
    match state.limiter.check(ip) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after_secs) => {
            tracing::warn!(
                client_ip = %ip,
                path = %request.uri().path(),
                retry_after_seconds = retry_after_secs,
                "Run submission rate limit exceeded"
            );
            Err(ServerError::RateLimitExceeded { retry_after_secs })
        }
    }
}

/// Structured request logging middleware.
///
/// Logs method, path, status and duration.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_per_ip() {
        let limiter = RunLimiter::new(2, Duration::from_secs(3600));
        let a = IpAddr::from([10, 0, 0, 1]);
        let b = IpAddr::from([10, 0, 0, 2]);

        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(a).is_ok());
        let retry = limiter.check(a).unwrap_err();
        // One slot refills every half hour.
        assert!(retry > 1700 && retry <= 1800, "retry after {retry}s");

        assert!(limiter.check(b).is_ok());
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let limiter = RunLimiter::new(0, Duration::from_secs(60));
        let ip = IpAddr::from([127, 0, 0, 1]);
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_err());
    }
}
