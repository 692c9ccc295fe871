//! Scripted scraper double and fixtures for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::scraper::{LiveItem, ScrapeError, ScrapeSession, Scraper};

pub fn item(id: &str, channel: &str) -> LiveItem {
    LiveItem {
        id: id.to_string(),
        title: format!("soulcity {id}"),
        url: format!("https://www.youtube.com/watch?v={id}"),
        channel_id: channel.to_string(),
        channel_name: channel.trim_start_matches('@').to_string(),
        channel_url: format!("https://www.youtube.com/{channel}"),
        viewer_count: 10,
    }
}

/// What a scripted call answers with.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Value(T),
    Empty,
    Navigation,
    Extraction,
    SessionLost,
    Hang,
}

#[derive(Default)]
struct Script {
    search: Option<Reply<Vec<LiveItem>>>,
    search_delay: Option<Duration>,
    avatars: HashMap<String, Reply<String>>,
    subscribers: HashMap<String, Reply<u64>>,
    fail_sessions: bool,
}

#[derive(Default)]
struct Calls {
    sessions: AtomicUsize,
    search: AtomicUsize,
    avatar: AtomicUsize,
    subscribers: AtomicUsize,
}

/// A [`Scraper`] whose answers are set per test. Clones share the script.
#[derive(Clone, Default)]
pub struct FakeScraper {
    script: Arc<Mutex<Script>>,
    calls: Arc<Calls>,
}

impl FakeScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search(&self, reply: Reply<Vec<LiveItem>>) {
        self.script.lock().unwrap().search = Some(reply);
    }

    pub fn delay_search(&self, delay: Duration) {
        self.script.lock().unwrap().search_delay = Some(delay);
    }

    pub fn set_avatar(&self, channel: &str, reply: Reply<String>) {
        self.script
            .lock()
            .unwrap()
            .avatars
            .insert(channel.to_string(), reply);
    }

    pub fn set_subscribers(&self, channel: &str, reply: Reply<u64>) {
        self.script
            .lock()
            .unwrap()
            .subscribers
            .insert(channel.to_string(), reply);
    }

    pub fn fail_sessions(&self, fail: bool) {
        self.script.lock().unwrap().fail_sessions = fail;
    }

    pub fn sessions_opened(&self) -> usize {
        self.calls.sessions.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.calls.search.load(Ordering::SeqCst)
    }

    pub fn avatar_calls(&self) -> usize {
        self.calls.avatar.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for FakeScraper {
    async fn open_session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError> {
        if self.script.lock().unwrap().fail_sessions {
            return Err(ScrapeError::ResourceAcquisition("scripted failure".into()));
        }
        self.calls.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

async fn answer<T>(reply: Option<Reply<T>>, target: &str) -> Result<Option<T>, ScrapeError> {
    match reply.unwrap_or(Reply::Empty) {
        Reply::Value(v) => Ok(Some(v)),
        Reply::Empty => Ok(None),
        Reply::Navigation => Err(ScrapeError::Navigation {
            url: target.to_string(),
            source: anyhow::anyhow!("connection reset"),
        }),
        Reply::Extraction => Err(ScrapeError::Extraction {
            url: target.to_string(),
            reason: "scripted".into(),
        }),
        Reply::SessionLost => Err(ScrapeError::ResourceAcquisition("session closed".into())),
        Reply::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl ScrapeSession for FakeScraper {
    async fn search_live(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiveItem>, ScrapeError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        let (reply, delay) = {
            let script = self.script.lock().unwrap();
            (script.search.clone(), script.search_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let items = answer(reply, query).await?.unwrap_or_default();
        Ok(items.into_iter().take(max_results).collect())
    }

    async fn channel_avatar(&mut self, channel_id: &str) -> Result<Option<String>, ScrapeError> {
        self.calls.avatar.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap().avatars.get(channel_id).cloned();
        answer(reply, channel_id).await
    }

    async fn subscriber_count(&mut self, channel_id: &str) -> Result<Option<u64>, ScrapeError> {
        self.calls.subscribers.fetch_add(1, Ordering::SeqCst);
        let reply = self.script.lock().unwrap().subscribers.get(channel_id).cloned();
        answer(reply, channel_id).await
    }
}
