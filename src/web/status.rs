//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;
use ts_rs::TS;

use crate::enrich::EnrichmentKind;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
    #[ts(type = "number")]
    since_secs: u64,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CacheInfo {
    /// RFC 3339 time of the last successful refresh.
    last_refresh: Option<String>,
    cached_items: usize,
    /// Size of the last successful result set, kept even if the live copy expires.
    stale_items: usize,
    cached_avatars: usize,
    cached_subscriber_counts: usize,
    pending_avatars: usize,
    pending_subscriber_counts: usize,
    refreshing: bool,
    session_busy: bool,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    started_at: String,
    services: BTreeMap<String, ServiceInfo>,
    cache: CacheInfo,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn overall_status(services: &BTreeMap<String, ServiceInfo>) -> ServiceStatus {
    if services.is_empty() {
        ServiceStatus::Disabled
    } else if services
        .values()
        .any(|s| matches!(s.status, ServiceStatus::Error))
    {
        ServiceStatus::Error
    } else if services
        .values()
        .all(|s| matches!(s.status, ServiceStatus::Active))
    {
        ServiceStatus::Active
    } else {
        ServiceStatus::Starting
    }
}

/// Status endpoint: service health plus cache and queue gauges.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services: BTreeMap<_, _> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status, since_secs)| {
            (
                name.clone(),
                ServiceInfo {
                    name,
                    status,
                    since_secs,
                },
            )
        })
        .collect();

    let cache = CacheInfo {
        last_refresh: state.live.last_refresh().map(|s| s.at.to_rfc3339()),
        cached_items: state.live.snapshot().len(),
        stale_items: state.live.stale_snapshot().len(),
        cached_avatars: state.channels.avatars.len(),
        cached_subscriber_counts: state.channels.subscribers.len(),
        pending_avatars: state.queues.pending(EnrichmentKind::Avatar).len(),
        pending_subscriber_counts: state.queues.pending(EnrichmentKind::SubscriberCount).len(),
        refreshing: state.guards.refresh.is_held(),
        session_busy: state.guards.session.is_held(),
    };

    Json(StatusResponse {
        status: overall_status(&services),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_SHORT").to_string(),
        started_at: state.started_at.to_rfc3339(),
        services,
        cache,
    })
}
