//! HTTP scraper for YouTube search and channel pages.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::scraper::errors::ScrapeError;
use crate::scraper::models::LiveItem;
use crate::scraper::{ScrapeSession, Scraper, parse};

/// Search filter parameter selecting live streams only.
const LIVE_FILTER: &str = "EgJAAQ==";

/// Opens cookie-carrying HTTP sessions against YouTube.
#[derive(Debug, Clone)]
pub struct YoutubeScraper {
    base_url: String,
    user_agent: String,
    navigation_timeout: Duration,
}

impl YoutubeScraper {
    pub fn new(base_url: String, user_agent: String, navigation_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl Scraper for YoutubeScraper {
    async fn open_session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(&self.user_agent)
            .timeout(self.navigation_timeout)
            .build()
            .map_err(|e| ScrapeError::ResourceAcquisition(e.to_string()))?;

        trace!(base_url = %self.base_url, "Opened YouTube session");
        Ok(Box::new(YoutubeSession {
            http,
            base_url: self.base_url.clone(),
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

struct YoutubeSession {
    http: reqwest::Client,
    base_url: String,
    navigation_timeout: Duration,
}

impl YoutubeSession {
    fn search_url(&self, query: &str) -> Result<String, ScrapeError> {
        let mut url = Url::parse(&format!("{}/results", self.base_url))
            .map_err(|e| ScrapeError::ResourceAcquisition(format!("invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("search_query", query)
            .append_pair("sp", LIVE_FILTER);
        Ok(url.into())
    }

    fn channel_url(&self, channel_id: &str) -> String {
        format!("{}/{}", self.base_url, channel_id.trim_start_matches('/'))
    }

    async fn get_page(&self, url: &str) -> Result<String, ScrapeError> {
        let navigation_error = |e: reqwest::Error| {
            if e.is_timeout() {
                ScrapeError::Timeout {
                    url: url.to_string(),
                    after: self.navigation_timeout,
                }
            } else {
                ScrapeError::Navigation {
                    url: url.to_string(),
                    source: e.into(),
                }
            }
        };

        let response = self.http.get(url).send().await.map_err(navigation_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                source: anyhow::anyhow!("unexpected status {status}"),
            });
        }
        let body = response.text().await.map_err(navigation_error)?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

#[async_trait]
impl ScrapeSession for YoutubeSession {
    async fn search_live(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiveItem>, ScrapeError> {
        let url = self.search_url(query)?;
        let html = self.get_page(&url).await?;
        let data = parse::extract_initial_data(&html).ok_or_else(|| ScrapeError::Extraction {
            url: url.clone(),
            reason: "ytInitialData not found".to_string(),
        })?;
        Ok(parse::parse_search_results(
            &data,
            &self.base_url,
            query,
            max_results,
        ))
    }

    async fn channel_avatar(&mut self, channel_id: &str) -> Result<Option<String>, ScrapeError> {
        let html = self.get_page(&self.channel_url(channel_id)).await?;
        Ok(parse::parse_avatar(&html))
    }

    async fn subscriber_count(&mut self, channel_id: &str) -> Result<Option<u64>, ScrapeError> {
        let html = self.get_page(&self.channel_url(channel_id)).await?;
        Ok(parse::parse_subscriber_count(&html))
    }
}
