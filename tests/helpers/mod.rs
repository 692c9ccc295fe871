//! Shared fixtures for integration tests: a scripted in-memory scraper.

#![allow(dead_code)]

use async_trait::async_trait;
use livefeed::scraper::{LiveItem, ScrapeError, ScrapeSession, Scraper};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn live_item(id: &str, channel: &str) -> LiveItem {
    LiveItem {
        id: id.to_owned(),
        title: format!("SoulCity RP - {id}"),
        url: format!("https://www.youtube.com/watch?v={id}"),
        channel_id: channel.to_owned(),
        channel_name: channel.trim_start_matches('@').to_owned(),
        channel_url: format!("https://www.youtube.com/{channel}"),
        viewer_count: 120,
    }
}

#[derive(Default)]
struct Script {
    items: Vec<LiveItem>,
    fail_search: bool,
    avatars: HashMap<String, String>,
    subscribers: HashMap<String, u64>,
    searches: usize,
    avatar_lookups: usize,
    subscriber_lookups: usize,
}

/// Scraper whose upstream "site" is a set of maps the test edits.
#[derive(Clone, Default)]
pub struct ScriptedScraper {
    script: Arc<Mutex<Script>>,
}

impl ScriptedScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_items(&self, items: Vec<LiveItem>) {
        self.script.lock().unwrap().items = items;
    }

    pub fn fail_search(&self, fail: bool) {
        self.script.lock().unwrap().fail_search = fail;
    }

    pub fn set_channel(&self, channel: &str, avatar: &str, subscribers: u64) {
        let mut script = self.script.lock().unwrap();
        script.avatars.insert(channel.to_owned(), avatar.to_owned());
        script.subscribers.insert(channel.to_owned(), subscribers);
    }

    pub fn searches(&self) -> usize {
        self.script.lock().unwrap().searches
    }

    pub fn avatar_lookups(&self) -> usize {
        self.script.lock().unwrap().avatar_lookups
    }

    pub fn subscriber_lookups(&self) -> usize {
        self.script.lock().unwrap().subscriber_lookups
    }
}

#[async_trait]
impl Scraper for ScriptedScraper {
    async fn open_session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ScrapeSession for ScriptedScraper {
    async fn search_live(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiveItem>, ScrapeError> {
        let mut script = self.script.lock().unwrap();
        script.searches += 1;
        if script.fail_search {
            return Err(ScrapeError::Navigation {
                url: format!("search:{query}"),
                source: anyhow::anyhow!("net::ERR_CONNECTION_RESET"),
            });
        }
        Ok(script.items.iter().take(max_results).cloned().collect())
    }

    async fn channel_avatar(&mut self, channel_id: &str) -> Result<Option<String>, ScrapeError> {
        let mut script = self.script.lock().unwrap();
        script.avatar_lookups += 1;
        Ok(script.avatars.get(channel_id).cloned())
    }

    async fn subscriber_count(&mut self, channel_id: &str) -> Result<Option<u64>, ScrapeError> {
        let mut script = self.script.lock().unwrap();
        script.subscriber_lookups += 1;
        Ok(script.subscribers.get(channel_id).copied())
    }
}
