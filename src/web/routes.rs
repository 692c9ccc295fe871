//! Web API router construction.

use axum::{Router, routing::get};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::rate_limit::{RateLimitLayer, SharedRateLimitState};
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{live, status};

/// Upper bound on any request, including a cold-start wait.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the web server router
pub fn create_router(app_state: AppState, rate_limit: SharedRateLimitState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/live-items", get(live::live_items))
        .route("/live-videos", get(live::live_videos))
        .with_state(app_state);

    Router::new()
        .nest("/api", api_router)
        .fallback(not_found)
        .layer((
            // Outermost: per-request ID span + severity-proportional response logging.
            RequestIdLayer,
            CompressionLayer::new()
                .zstd(true)
                .br(true)
                .gzip(true)
                .quality(tower_http::CompressionLevel::Fastest),
            TimeoutLayer::new(REQUEST_TIMEOUT),
            CorsLayer::permissive(),
            RateLimitLayer::new(rate_limit),
        ))
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeScraper, item};
    use crate::web::middleware::rate_limit::RateLimitState;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn warm_state() -> AppState {
        let state = AppState::for_tests(Arc::new(FakeScraper::new()));
        state.live.replace(vec![item("v1", "@a"), item("v2", "@b")]);
        state
            .channels
            .avatars
            .set("@a".into(), "https://yt3/a.jpg".into());
        state.channels.subscribers.set("@a".into(), 1_200);
        state
    }

    fn router(state: AppState, per_minute: u32) -> Router {
        create_router(state, Arc::new(RateLimitState::new(per_minute)))
    }

    fn get_from(path: &str, ip: &'static str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -- live items --

    #[tokio::test]
    async fn live_items_returns_enriched_envelope() {
        let app = router(warm_state(), 100);

        let response = app
            .oneshot(get_from("/api/live-items", "192.0.2.1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "v1");
        assert_eq!(items[0]["channelAvatarUrl"], "https://yt3/a.jpg");
        assert_eq!(items[0]["subscriberCount"], 1_200);
        assert_eq!(items[1]["channelAvatarUrl"], "");
        assert_eq!(items[1]["subscriberCount"], 0);
    }

    #[tokio::test]
    async fn live_videos_keeps_its_own_field_names() {
        let app = router(warm_state(), 100);
        let response = app
            .oneshot(get_from("/api/live-videos", "192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert!(body.get("items").is_none());
        let videos = body["videos"].as_array().unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0]["videoId"], "v1");
        assert_eq!(videos[0]["viewers"], 10);
        assert_eq!(videos[0]["channelId"], "@a");
        assert_eq!(videos[0]["channelAvatar"], "https://yt3/a.jpg");
        assert_eq!(videos[0]["channelSubs"], 1_200);
        assert_eq!(videos[1]["channelAvatar"], "");
        assert_eq!(videos[1]["channelSubs"], 0);
    }

    // -- probes --

    #[tokio::test]
    async fn status_reports_cache_gauges() {
        let state = warm_state();
        state.queues.seed_items(&state.live.snapshot(), &state.channels);
        let app = router(state, 100);

        let response = app
            .oneshot(get_from("/api/status", "192.0.2.1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["cache"]["cachedItems"], 2);
        assert_eq!(body["cache"]["staleItems"], 2);
        assert_eq!(body["cache"]["pendingAvatars"], 1);
        assert_eq!(body["cache"]["pendingSubscriberCounts"], 1);
        assert_eq!(body["cache"]["refreshing"], false);
        assert!(body["cache"]["lastRefresh"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let app = router(warm_state(), 100);
        let response = app.oneshot(get_from("/nope", "192.0.2.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["success"], false);
    }

    // -- rate limiting --

    #[tokio::test]
    async fn excess_requests_are_rejected_per_ip() {
        let app = router(warm_state(), 2);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_from("/api/live-items", "198.51.100.7"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let rejected = app
            .clone()
            .oneshot(get_from("/api/live-items", "198.51.100.7"))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(rejected.headers().contains_key("retry-after"));

        let other = app
            .clone()
            .oneshot(get_from("/api/live-items", "198.51.100.8"))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);

        let health = app
            .clone()
            .oneshot(get_from("/api/health", "198.51.100.7"))
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let outside_api = app
            .oneshot(get_from("/robots.txt", "198.51.100.7"))
            .await
            .unwrap();
        assert_eq!(outside_api.status(), StatusCode::NOT_FOUND);
    }
}
