//! Rate limiting middleware.
//!
//! Limits how often each caller may submit images for analysis. Vision model
//! calls are slow and expensive, so the quota is per user, not global.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::app::AppState;
use crate::extractors::Caller;

/// Fallback when the configured quota is zero.
const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

type UserRateLimiter = GovRateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Per-user rate limiter shared across all requests.
pub struct RateLimiterState {
    limiter: UserRateLimiter,
    clock: DefaultClock,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Create a new rate limiter allowing `rate_limit_per_minute` per user.
    pub fn new(rate_limit_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(DEFAULT_PER_MINUTE);
        Self {
            limiter: GovRateLimiter::keyed(Quota::per_minute(per_minute)),
            clock: DefaultClock::default(),
            rate_limit_per_minute: per_minute.get(),
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Check if a request from the given user should be allowed.
    /// Returns Ok(()) if allowed, or Err with retry_after seconds if rate limited.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        match self.limiter.check_key(&user_id) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(self.clock.now());
                Err(wait_time.as_secs().max(1))
            }
        }
    }

    /// Drops state for users whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_users(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_users", &self.tracked_users())
            .finish()
    }
}

/// Middleware that applies rate limiting per caller.
///
/// Must run after `require_caller` so the caller is in request extensions.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let caller = match req.extensions().get::<Caller>() {
        Some(caller) => caller.user_id,
        None => return next.run(req).await,
    };

    if let Some(ref rate_limiter) = state.rate_limiter {
        if let Err(retry_after) = rate_limiter.check(caller) {
            tracing::warn!(user_id = %caller, retry_after, "Analysis rate limit exceeded");
            metrics::counter!("rate_limited_requests_total").increment(1);
            return rate_limited_response(rate_limiter.rate_limit_per_minute(), retry_after);
        }
    }

    next.run(req).await
}

/// Create a rate limited response with proper headers and body.
fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limit_exceeded",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

    response
}
