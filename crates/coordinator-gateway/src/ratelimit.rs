//! Token-bucket rate limiting, keyed by authenticated identity
//! (admin secret present) or source address otherwise.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::app::AppState;
use crate::error::GatewayError;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub struct RateLimiters {
    authenticated: KeyedLimiter,
    public: KeyedLimiter,
}

impl RateLimiters {
    pub fn new(authenticated_per_sec: u32, public_per_sec: u32) -> Self {
        Self {
            authenticated: RateLimiter::keyed(quota(authenticated_per_sec)),
            public: RateLimiter::keyed(quota(public_per_sec)),
        }
    }
}

fn quota(per_sec: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(per_sec.max(1)).unwrap())
}

fn identity_key(headers: &HeaderMap, addr: Option<SocketAddr>) -> (String, bool) {
    if let Some(secret) = headers.get("x-admin-secret").and_then(|v| v.to_str().ok()) {
        return (format!("admin:{secret}"), true);
    }
    let source = addr.map(|a| a.ip().to_string()).unwrap_or_else(|| "unknown".to_string());
    (source, false)
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let (key, authenticated) = identity_key(req.headers(), Some(addr));
    let limiter = if authenticated {
        &state.rate_limiters.authenticated
    } else {
        &state.rate_limiters.public
    };

    if limiter.check_key(&key).is_err() {
        return Err(GatewayError::RateLimited);
    }

    Ok(next.run(req).await)
}
