//! Error types for the scraping capability.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The scraping session itself could not be obtained or died.
    #[error("Failed to acquire scrape session: {0}")]
    ResourceAcquisition(String),
    #[error("Navigation to {url} failed")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Navigation to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("Unexpected page shape at {url}: {reason}")]
    Extraction { url: String, reason: String },
}

impl ScrapeError {
    /// Fatal errors abort the whole refresh cycle or queue drain; everything
    /// else only affects the current key.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::ResourceAcquisition(_))
    }

    /// Short stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::ResourceAcquisition(_) => "resource_acquisition",
            ScrapeError::Navigation { .. } => "navigation",
            ScrapeError::Timeout { .. } => "timeout",
            ScrapeError::Extraction { .. } => "extraction",
        }
    }
}
