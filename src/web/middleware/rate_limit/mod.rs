//! Per-IP inbound rate limiting for the `/api` routes.
//!
//! One keyed token bucket: `per_minute` requests per minute with a burst of
//! the same size. Paths outside `/api/` and the health and status probes are
//! never limited. Requests whose client address cannot be determined are let
//! through.

use crate::web::middleware::client_ip::resolve_client_ip;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter, clock::Clock};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tracing::warn;

const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

/// Quota helper: `count` requests per `period` with burst = count.
fn quota(count: NonZeroU32, period: Duration) -> Quota {
    Quota::with_period(period / count.get())
        .unwrap_or_else(|| Quota::per_second(count))
        .allow_burst(count)
}

fn is_exempt(path: &str) -> bool {
    !path.starts_with("/api/")
        || path.starts_with("/api/health")
        || path.starts_with("/api/status")
}

pub struct RateLimitState {
    per_ip: DefaultKeyedRateLimiter<IpAddr>,
}

impl RateLimitState {
    /// A limiter allowing `per_minute` requests per client per minute.
    /// Zero is clamped to one.
    pub fn new(per_minute: u32) -> Self {
        let count = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            per_ip: RateLimiter::keyed(quota(count, Duration::from_secs(60))),
        }
    }

    /// `Err(retry_after_secs)` when `ip` is over budget.
    fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.per_ip.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(governor::clock::DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }
}

pub type SharedRateLimitState = Arc<RateLimitState>;

// -- Tower Layer + Service --

#[derive(Clone)]
pub struct RateLimitLayer {
    state: SharedRateLimitState,
}

impl RateLimitLayer {
    pub fn new(state: SharedRateLimitState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: SharedRateLimitState,
}

impl<S, ResBody> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response<ResBody>> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug + Send,
    ResBody: Send + 'static,
    Body: Into<ResBody>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let path = req.uri().path();
        if is_exempt(path) {
            return Box::pin(self.inner.call(req));
        }

        let Some(ip) = resolve_client_ip(req.headers(), req.extensions()) else {
            return Box::pin(self.inner.call(req));
        };

        match self.state.check(ip) {
            Ok(()) => Box::pin(self.inner.call(req)),
            Err(retry_after) => {
                warn!(
                    client_ip = %ip,
                    path = %path,
                    retry_after_secs = retry_after,
                    "Rate limit exceeded"
                );
                let resp = rate_limit_response(retry_after).map(Into::into);
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}

fn rate_limit_response(retry_after: u64) -> Response<Body> {
    let body = serde_json::json!({
        "success": false,
        "items": [],
        "message": REJECTION_MESSAGE,
    });
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response
        .headers_mut()
        .insert("retry-after", HeaderValue::from(retry_after));
    response
}
