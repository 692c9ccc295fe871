//! The scraping capability: searching for live streams and looking up
//! per-channel details.
//!
//! The rest of the crate only sees the [`Scraper`] and [`ScrapeSession`]
//! traits. A session stands for the one scarce upstream resource (a browser,
//! a cookie-carrying client); callers hold the `session` single-flight permit
//! for as long as a session is open.

pub mod errors;
pub mod models;
pub mod parse;
pub mod youtube;

pub use errors::ScrapeError;
pub use models::LiveItem;
pub use youtube::YoutubeScraper;

use async_trait::async_trait;

/// Opens scraping sessions.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Acquire the upstream resource. Failure here is
    /// [`ScrapeError::ResourceAcquisition`] and aborts the caller's cycle.
    async fn open_session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError>;
}

/// One open session against the upstream site.
#[async_trait]
pub trait ScrapeSession: Send {
    /// Search for live streams matching `query`, returning at most `max_results`.
    ///
    /// An empty list is a successful scrape that found nothing.
    async fn search_live(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiveItem>, ScrapeError>;

    /// The channel's avatar image URL, `None` if the page has none.
    async fn channel_avatar(&mut self, channel_id: &str) -> Result<Option<String>, ScrapeError>;

    /// The channel's subscriber count, `None` if it could not be read.
    async fn subscriber_count(&mut self, channel_id: &str) -> Result<Option<u64>, ScrapeError>;
}
