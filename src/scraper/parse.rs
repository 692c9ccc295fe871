//! HTML and `ytInitialData` parsing for YouTube search and channel pages.
//!
//! YouTube renders its pages client-side from a JSON blob assigned to
//! `ytInitialData` in an inline script. Search results are read from that
//! blob; channel avatars come from the `og:image` meta tag and subscriber
//! counts from the first "N subscribers" text on the page.

use html_scraper::{Html, Selector};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::scraper::models::LiveItem;

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("static selector"));
static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image"], link[rel="image_src"]"#)
        .expect("static selector")
});
static COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,.]*)\s*([KMB]?)").expect("static regex"));
static SUBSCRIBERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,.]*\s*[KMB]?)\s+subscribers").expect("static regex")
});

const INITIAL_DATA_MARKER: &str = "ytInitialData";

/// Parse counts like `"1,234 watching"`, `"1.2M subscribers"` or `"15K"`.
///
/// Returns `None` when the text holds no number.
pub fn parse_abbreviated_count(text: &str) -> Option<u64> {
    let caps = COUNT.captures(text.trim())?;
    let number: f64 = caps[1].replace(',', "").parse().ok()?;
    let multiplier = match &caps[2] {
        "K" => 1_000.0,
        "M" => 1_000_000.0,
        "B" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((number * multiplier).round() as u64)
}

/// Extract and parse the `ytInitialData` JSON object from a page.
pub fn extract_initial_data(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    document.select(&SCRIPT).find_map(|script| {
        let text: String = script.text().collect();
        let marker = text.find(INITIAL_DATA_MARKER)?;
        let start = marker + text[marker..].find('{')?;
        // The blob is followed by `;` and sometimes more statements; only the
        // first JSON value is wanted.
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()
    })
}

/// Collect live items from a search page's `ytInitialData`.
///
/// Keeps only titles containing `query` (case-insensitive), drops duplicate
/// video ids and stops at `max_results`.
pub fn parse_search_results(
    data: &Value,
    base_url: &str,
    query: &str,
    max_results: usize,
) -> Vec<LiveItem> {
    let mut renderers = Vec::new();
    collect_video_renderers(data, &mut renderers);

    let needle = query.to_lowercase();
    let mut seen = HashSet::new();
    renderers
        .into_iter()
        .filter_map(|renderer| video_from_renderer(renderer, base_url))
        .filter(|item| item.title.to_lowercase().contains(&needle))
        .filter(|item| seen.insert(item.id.clone()))
        .take(max_results)
        .collect()
}

/// The channel avatar URL from a channel page, if present and non-empty.
pub fn parse_avatar(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_IMAGE)
        .find_map(|el| el.attr("content").or_else(|| el.attr("href")))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
}

/// The subscriber count from a channel page. Zero is treated as unknown.
pub fn parse_subscriber_count(html: &str) -> Option<u64> {
    SUBSCRIBERS
        .captures_iter(html)
        .find_map(|caps| parse_abbreviated_count(&caps[1]))
        .filter(|&count| count > 0)
}

fn collect_video_renderers<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "videoRenderer" {
                    out.push(child);
                } else {
                    collect_video_renderers(child, out);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_video_renderers(child, out);
            }
        }
        _ => {}
    }
}

/// Text of a `{ "simpleText": .. }` or `{ "runs": [{ "text": .. }] }` node.
fn text_of(node: &Value) -> Option<String> {
    if let Some(simple) = node["simpleText"].as_str() {
        return Some(simple.trim().to_string());
    }
    let runs = node["runs"].as_array()?;
    let joined: String = runs.iter().filter_map(|run| run["text"].as_str()).collect();
    Some(joined.trim().to_string()).filter(|s| !s.is_empty())
}

fn video_from_renderer(renderer: &Value, base_url: &str) -> Option<LiveItem> {
    let id = renderer["videoId"].as_str()?.to_string();
    let title = text_of(&renderer["title"])?;

    let owner = &renderer["ownerText"]["runs"][0];
    let channel_name = owner["text"].as_str()?.trim().to_string();
    let browse = &owner["navigationEndpoint"]["browseEndpoint"];
    let channel_path = browse["canonicalBaseUrl"]
        .as_str()
        .map(|path| path.trim_start_matches('/').to_string())
        .or_else(|| {
            browse["browseId"]
                .as_str()
                .map(|browse_id| format!("channel/{browse_id}"))
        })?;

    let viewer_count = text_of(&renderer["viewCountText"])
        .and_then(|text| parse_abbreviated_count(&text))
        .unwrap_or(0);

    let base = base_url.trim_end_matches('/');
    Some(LiveItem {
        url: format!("{base}/watch?v={id}"),
        channel_url: format!("{base}/{channel_path}"),
        id,
        title,
        channel_id: channel_path,
        channel_name,
        viewer_count,
    })
}
