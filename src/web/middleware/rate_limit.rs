//! Per-IP rate limiting.
//!
//! Credential endpoints (login, register, refresh) get a tight budget; the
//! rest of the API a generous one. Buckets are keyed by client IP.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::{ApiError, ErrorCode};

/// Rate limiter keyed by client IP.
pub type KeyedRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// How often idle buckets are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Limiters for the credential endpoints and the general API.
pub struct RateLimitState {
    credentials: KeyedRateLimiter,
    api: KeyedRateLimiter,
}

fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

impl RateLimitState {
    /// Create limiters allowing the given requests per minute per IP.
    pub fn new(credential_rate_limit: u32, api_rate_limit: u32) -> Self {
        Self {
            credentials: RateLimiter::keyed(per_minute(credential_rate_limit)),
            api: RateLimiter::keyed(per_minute(api_rate_limit)),
        }
    }

    /// Whether a credential request from `ip` is allowed.
    pub fn check_credentials(&self, ip: &str) -> bool {
        self.credentials.check_key(&ip.to_string()).is_ok()
    }

    /// Whether an API request from `ip` is allowed.
    pub fn check_api(&self, ip: &str) -> bool {
        self.api.check_key(&ip.to_string()).is_ok()
    }

    /// Drop buckets that have fully refilled.
    pub fn cleanup(&self) {
        self.credentials.retain_recent();
        self.api.retain_recent();
        self.credentials.shrink_to_fit();
        self.api.shrink_to_fit();
    }

    /// Periodically clean up in the background.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVAL).await;
                self.cleanup();
            }
        });
    }
}

/// Client IP, preferring proxy headers over the socket address.
fn client_ip(req: &Request<Body>) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("X-Forwarded-For").and_then(|v| v.split(',').next()) {
        return ip.trim().to_string();
    }
    if let Some(ip) = header("X-Real-IP") {
        return ip.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn too_many(message: &str) -> Response {
    ApiError::new(ErrorCode::TooManyRequests, message).into_response()
}

/// Rate limiting middleware for credential endpoints.
pub async fn credentials_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    if !state.check_credentials(&ip) {
        tracing::warn!(ip = %ip, path = %req.uri().path(), "Credential rate limit exceeded");
        return too_many("Too many attempts. Please try again later.");
    }
    next.run(req).await
}

/// Rate limiting middleware for the general API.
pub async fn api_rate_limit(state: Arc<RateLimitState>, req: Request<Body>, next: Next) -> Response {
    let ip = client_ip(&req);
    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return too_many("Too many requests. Please try again later.");
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_limit_per_ip() {
        let state = RateLimitState::new(3, 100);

        for _ in 0..3 {
            assert!(state.check_credentials("127.0.0.1"));
        }
        assert!(!state.check_credentials("127.0.0.1"));
        assert!(state.check_credentials("192.168.1.1"));
        // Separate budget from the general API
        assert!(state.check_api("127.0.0.1"));
    }

    #[test]
    fn test_api_limit() {
        let state = RateLimitState::new(5, 2);

        assert!(state.check_api("10.0.0.1"));
        assert!(state.check_api("10.0.0.1"));
        assert!(!state.check_api("10.0.0.1"));
    }

    #[test]
    fn test_zero_limit_allows_one() {
        let state = RateLimitState::new(0, 0);
        assert!(state.check_api("10.0.0.1"));
        assert!(!state.check_api("10.0.0.1"));
    }

    #[test]
    fn test_client_ip_sources() {
        let forwarded = Request::builder()
            .header("X-Forwarded-For", "203.0.113.5, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&forwarded), "203.0.113.5");

        let real = Request::builder()
            .header("X-Real-IP", "198.51.100.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&real), "198.51.100.7");

        let mut direct = Request::builder().body(Body::empty()).unwrap();
        direct
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&direct), "192.0.2.1");

        let none = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&none), "unknown");
    }
}
