//! Read path: joins the live snapshot with the per-channel caches.

use serde::Serialize;
use tokio::time::{self, Instant};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::jobs::{RefreshJob, RefreshOutcome, SkipReason};
use crate::scraper::LiveItem;
use crate::state::AppState;

/// A live item as served to clients. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: LiveItem,
    /// Empty until the avatar drain has reached this channel.
    pub channel_avatar_url: String,
    /// Zero until the subscriber drain has reached this channel.
    #[ts(type = "number")]
    pub subscriber_count: u64,
}

/// Compose the current snapshot with whatever auxiliary data is cached.
/// Never touches the network.
pub fn compose(state: &AppState) -> Vec<EnrichedItem> {
    let snapshot = state.live.snapshot();
    snapshot
        .iter()
        .map(|item| {
            let channel_id = item.channel_id.clone();
            EnrichedItem {
                channel_avatar_url: state.channels.avatars.get(&channel_id).unwrap_or_default(),
                subscriber_count: state.channels.subscribers.get(&channel_id).unwrap_or(0),
                item: item.clone(),
            }
        })
        .collect()
}

/// The list served by the HTTP endpoint.
///
/// Before the first refresh has ever completed, waits (bounded by
/// `cold_start_timeout`) for the next refresh cycle to finish. A reader may
/// start that cycle itself at most once per `refresh_interval`; otherwise it
/// only waits on one already running. Once warm this is exactly [`compose`].
pub async fn live_view(state: &AppState) -> Vec<EnrichedItem> {
    if !state.live.has_refreshed() && state.live.snapshot().is_empty() {
        warm_up(state).await;
    }
    compose(state)
}

async fn warm_up(state: &AppState) {
    let deadline = Instant::now() + state.policy.cold_start_timeout;
    let seen = state.live.attempts();

    if !state.guards.refresh.is_held() {
        if !state.live.claim_read_refresh(state.policy.refresh_interval) {
            debug!("Cold-start refresh attempted recently, serving empty list");
            return;
        }

        let job = RefreshJob::new(state);
        // Spawned so an abandoned request does not cancel the refresh.
        let handle = tokio::spawn(async move { job.run_once().await });
        match time::timeout_at(deadline, handle).await {
            Ok(Ok(RefreshOutcome::Skipped(SkipReason::AlreadyRefreshing))) => {}
            Ok(Ok(outcome)) => {
                debug!(?outcome, "Cold-start refresh finished");
                return;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Cold-start refresh task panicked");
                return;
            }
            Err(_) => {
                warn!("Cold-start refresh still running, serving empty list");
                return;
            }
        }
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    if !state.live.wait_for_attempt_after(seen, remaining).await {
        warn!("Timed out waiting for in-flight refresh at cold start");
    }
}
