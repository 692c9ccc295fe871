//! Records produced by the scraper.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One live stream found by a search scrape.
///
/// Immutable once cached; a refresh replaces the whole result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LiveItem {
    /// YouTube video id.
    pub id: String,
    pub title: String,
    pub url: String,
    /// Channel path segment, e.g. `@somehandle` or `channel/UC...`.
    pub channel_id: String,
    pub channel_name: String,
    pub channel_url: String,
    #[ts(type = "number")]
    pub viewer_count: u64,
}
