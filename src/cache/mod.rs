//! In-memory caches: the live result set and the per-channel enrichment data.

pub mod live;
pub mod ttl;

pub use live::{LiveCache, LiveSnapshot, RefreshAttempt, RefreshStamp};
pub use ttl::TtlCache;

use std::time::Duration;

/// Time-to-live for each cache instance.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    /// `None` keeps the live result set until the next refresh replaces it.
    pub live: Option<Duration>,
    pub avatar: Duration,
    pub subscribers: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            live: None,
            avatar: Duration::from_secs(24 * 60 * 60),
            subscribers: Duration::from_secs(30 * 60),
        }
    }
}

/// Auxiliary per-channel caches, keyed by channel id.
#[derive(Debug, Clone)]
pub struct ChannelCaches {
    pub avatars: TtlCache<String, String>,
    pub subscribers: TtlCache<String, u64>,
}

impl ChannelCaches {
    pub fn new(ttls: &CacheTtls) -> Self {
        Self {
            avatars: TtlCache::with_ttl(ttls.avatar),
            subscribers: TtlCache::with_ttl(ttls.subscribers),
        }
    }
}
