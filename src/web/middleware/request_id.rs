//! Per-request tracing spans and `X-Request-Id` propagation.
//!
//! An inbound `X-Request-Id` (from a proxy in front of us) is reused so logs
//! correlate across hops; otherwise a ULID is generated. The resolved id is
//! echoed on the response.

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

const REQUEST_ID: &str = "x-request-id";

/// Longest inbound id we accept verbatim.
const MAX_INBOUND_LEN: usize = 128;

fn request_id(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_INBOUND_LEN)
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

/// Log level follows severity: successes at debug, client errors at info,
/// server errors at warn.
fn log_response(method: &http::Method, path: &str, status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        200..=399 => tracing::debug!(method = %method, path, status, duration_ms, "Response"),
        400..=499 => tracing::info!(method = %method, path, status, duration_ms, "Response"),
        _ => tracing::warn!(method = %method, path, status, duration_ms, "Response"),
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
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
        let req_id = request_id(&req);
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let header_value = HeaderValue::from_str(&req_id).ok();
        let start = Instant::now();

        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &mut result {
                    Ok(response) => {
                        log_response(&method, &path, response.status(), duration_ms);
                        if let Some(value) = header_value {
                            response.headers_mut().insert(REQUEST_ID, value);
                        }
                    }
                    Err(e) => {
                        tracing::error!(method = %method, path = %path, error = ?e, duration_ms, "Request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
