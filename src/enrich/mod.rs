//! Background enrichment of channels with avatars and subscriber counts.
//!
//! A refresh seeds one [`PendingSet`] per [`EnrichmentKind`] with channels
//! whose auxiliary value is missing or expired; the
//! [`worker::EnrichmentWorker`] drains them out-of-band.

pub mod queue;
pub mod worker;

pub use queue::PendingSet;
pub use worker::{DrainOutcome, DrainStats, EnrichmentWorker};

use serde::Serialize;
use std::fmt;

use crate::cache::ChannelCaches;
use crate::scraper::LiveItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKind {
    Avatar,
    SubscriberCount,
}

impl EnrichmentKind {
    pub const ALL: [EnrichmentKind; 2] = [EnrichmentKind::Avatar, EnrichmentKind::SubscriberCount];

    pub fn as_str(self) -> &'static str {
        match self {
            EnrichmentKind::Avatar => "avatar",
            EnrichmentKind::SubscriberCount => "subscriber_count",
        }
    }

    /// Whether `caches` hold a fresh value of this kind for `channel_id`.
    pub fn is_cached(self, caches: &ChannelCaches, channel_id: &str) -> bool {
        let key = channel_id.to_string();
        match self {
            EnrichmentKind::Avatar => caches.avatars.has(&key),
            EnrichmentKind::SubscriberCount => caches.subscribers.has(&key),
        }
    }
}

impl fmt::Display for EnrichmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys newly queued by a seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedCounts {
    pub avatars: usize,
    pub subscribers: usize,
}

/// The two pending sets. Clone-cheap.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentQueues {
    avatars: PendingSet,
    subscribers: PendingSet,
}

impl EnrichmentQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self, kind: EnrichmentKind) -> &PendingSet {
        match kind {
            EnrichmentKind::Avatar => &self.avatars,
            EnrichmentKind::SubscriberCount => &self.subscribers,
        }
    }

    /// Queue `channel_id` for `kind` unless a fresh value is already cached.
    /// Returns whether the key was newly added.
    pub fn seed(&self, kind: EnrichmentKind, channel_id: &str, caches: &ChannelCaches) -> bool {
        if channel_id.is_empty() || kind.is_cached(caches, channel_id) {
            return false;
        }
        self.pending(kind).insert(channel_id)
    }

    /// Seed both kinds for every item's channel.
    pub fn seed_items(&self, items: &[LiveItem], caches: &ChannelCaches) -> SeedCounts {
        let mut counts = SeedCounts::default();
        for item in items {
            if self.seed(EnrichmentKind::Avatar, &item.channel_id, caches) {
                counts.avatars += 1;
            }
            if self.seed(EnrichmentKind::SubscriberCount, &item.channel_id, caches) {
                counts.subscribers += 1;
            }
        }
        counts
    }

    pub fn has_pending(&self) -> bool {
        !self.avatars.is_empty() || !self.subscribers.is_empty()
    }
}
