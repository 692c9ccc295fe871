//! `GET /api/live-items` and the older `GET /api/live-videos` shape.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, trace};
use ts_rs::TS;

use crate::state::AppState;
use crate::utils::log_if_slow;
use crate::view::{self, EnrichedItem};
use crate::web::error::ApiError;

/// Warm reads are pure memory; anything slower was a cold-start wait.
const SLOW_RESPONSE: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct LiveItemsResponse {
    pub success: bool,
    pub items: Vec<EnrichedItem>,
}

/// One entry of the `/api/live-videos` body, in the field names existing
/// clients of that path read.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LiveVideo {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub channel_name: String,
    pub channel_id: String,
    pub channel_url: String,
    #[ts(type = "number")]
    pub viewers: u64,
    pub channel_avatar: String,
    #[ts(type = "number")]
    pub channel_subs: u64,
}

impl From<EnrichedItem> for LiveVideo {
    fn from(enriched: EnrichedItem) -> Self {
        let item = enriched.item;
        Self {
            video_id: item.id,
            title: item.title,
            url: item.url,
            channel_name: item.channel_name,
            channel_id: item.channel_id,
            channel_url: item.channel_url,
            viewers: item.viewer_count,
            channel_avatar: enriched.channel_avatar_url,
            channel_subs: enriched.subscriber_count,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct LiveVideosResponse {
    pub success: bool,
    pub videos: Vec<LiveVideo>,
}

/// Compose the live view on its own task; a panic while composing surfaces
/// as `Err` instead of a dropped connection.
async fn compose_view(state: AppState) -> Option<Vec<EnrichedItem>> {
    let start = Instant::now();
    let items = tokio::spawn(async move { view::live_view(&state).await })
        .await
        .inspect_err(|e| error!(error = %e, "Failed to compose live items"))
        .ok()?;

    log_if_slow(start, SLOW_RESPONSE, "live items");
    trace!(count = items.len(), "live items served");
    Some(items)
}

pub(super) async fn live_items(
    State(state): State<AppState>,
) -> Result<Json<LiveItemsResponse>, ApiError> {
    let items = compose_view(state).await.ok_or_else(ApiError::live_items)?;
    Ok(Json(LiveItemsResponse {
        success: true,
        items,
    }))
}

pub(super) async fn live_videos(
    State(state): State<AppState>,
) -> Result<Json<LiveVideosResponse>, ApiError> {
    let items = compose_view(state).await.ok_or_else(ApiError::live_videos)?;
    Ok(Json(LiveVideosResponse {
        success: true,
        videos: items.into_iter().map(LiveVideo::from).collect(),
    }))
}
