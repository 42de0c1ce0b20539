use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::settings;

/// Sliding window rate limit state shared across requests.
///
/// Counters are process-local; behind a load balancer each process enforces
/// its own window. Moving them to a shared store is a deployment choice, not
/// part of the HTTP contract.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Arc<Mutex<RateLimitInner>>,
}

struct RateLimitInner {
    /// Map from client key -> list of request timestamps.
    requests: HashMap<String, Vec<Instant>>,
    /// Maximum requests allowed within the window.
    max_requests: u32,
    /// Sliding window duration.
    window: Duration,
}

impl RateLimitState {
    /// Create rate limiter allowing `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimitInner {
                requests: HashMap::new(),
                max_requests,
                window,
            })),
        }
    }

    /// General API limit: 1000 requests per hour per user.
    pub fn general() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Search limit: 30 requests per minute per user.
    pub fn search() -> Self {
        Self::new(30, Duration::from_secs(60))
    }

    /// Check if a request from `key` is allowed. Returns true if allowed.
    fn check(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let cutoff = now - inner.window;
        let max = inner.max_requests;

        let timestamps = inner.requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| *t > cutoff);

        if timestamps.len() as u32 >= max {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Derive the per-user limiting key from request headers. Falls back to a
/// shared anonymous bucket for unauthenticated requests.
fn client_key(request: &Request) -> String {
    if let Some(val) = request.headers().get("authorization") {
        if let Ok(s) = val.to_str() {
            if let Some(token) = s.strip_prefix("Bearer ") {
                return token.trim().to_string();
            }
        }
    }
    request
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

/// Axum middleware enforcing a sliding-window limit per user.
/// Disabled entirely in development.
pub async fn rate_limit_middleware(
    axum::extract::State(state): axum::extract::State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if settings().is_development() {
        return next.run(request).await;
    }

    let key = client_key(&request);
    if !state.check(&key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "kind": "RateLimited",
                "detail": "Rate limit exceeded. Please try again later."
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let state = RateLimitState::new(3, Duration::from_secs(60));
        assert!(state.check("user-a"));
        assert!(state.check("user-a"));
        assert!(state.check("user-a"));
        assert!(!state.check("user-a"));
    }

    #[test]
    fn keys_are_independent() {
        let state = RateLimitState::new(1, Duration::from_secs(60));
        assert!(state.check("user-a"));
        assert!(state.check("user-b"));
        assert!(!state.check("user-a"));
    }

    #[test]
    fn window_expiry_frees_budget() {
        let state = RateLimitState::new(1, Duration::from_millis(10));
        assert!(state.check("user-a"));
        assert!(!state.check("user-a"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(state.check("user-a"));
    }
}
