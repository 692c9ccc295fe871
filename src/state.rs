//! Application state shared across components (web, refresh job, drains).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use ts_rs::TS;

use crate::cache::{CacheTtls, ChannelCaches, LiveCache};
use crate::enrich::EnrichmentQueues;
use crate::guard::Guards;
use crate::jobs::RefreshPolicy;
use crate::scraper::Scraper;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Starting,
    Active,
    Disabled,
    Error,
}

/// A timestamped status entry for a service.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: ServiceStatus,
    pub updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status.clone())
    }

    /// Snapshot of all services with seconds since their last status change.
    pub fn all(&self) -> Vec<(String, ServiceStatus, u64)> {
        self.inner
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().status.clone(),
                    entry.value().updated_at.elapsed().as_secs(),
                )
            })
            .collect()
    }
}

/// Handles to every cache, queue and guard. Clone-cheap; all clones share
/// the same underlying state.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<dyn Scraper>,
    pub live: LiveCache,
    pub channels: ChannelCaches,
    pub queues: EnrichmentQueues,
    pub guards: Guards,
    pub policy: Arc<RefreshPolicy>,
    pub service_statuses: ServiceStatusRegistry,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scraper: Arc<dyn Scraper>, policy: RefreshPolicy, ttls: CacheTtls) -> Self {
        Self {
            scraper,
            live: LiveCache::new(ttls.live),
            channels: ChannelCaches::new(&ttls),
            queues: EnrichmentQueues::new(),
            guards: Guards::new(),
            policy: Arc::new(policy),
            service_statuses: ServiceStatusRegistry::new(),
            started_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(scraper: Arc<dyn Scraper>) -> Self {
        Self::new(scraper, RefreshPolicy::default(), CacheTtls::default())
    }
}
