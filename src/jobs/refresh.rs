//! One refresh cycle of the live cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, error, info, trace};

use crate::cache::{ChannelCaches, LiveCache, RefreshAttempt};
use crate::enrich::{EnrichmentQueues, SeedCounts};
use crate::guard::{FlightPermit, Guards};
use crate::scraper::{LiveItem, ScrapeError, Scraper};
use crate::state::AppState;
use crate::utils::fmt_duration;

/// Why a refresh tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The previous refresh is still running.
    AlreadyRefreshing,
    /// A queue drain holds the scrape session.
    SessionBusy,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Refreshed { items: usize, seeded: SeedCounts },
    Skipped(SkipReason),
    /// The previous result set is still being served.
    Failed(ScrapeError),
}

/// Everything a running cycle holds. Fields drop in order, so the guards are
/// free again by the time waiters learn the cycle finished.
struct Cycle {
    _session: FlightPermit,
    _refresh: FlightPermit,
    _attempt: RefreshAttempt,
}

/// Rebuilds the live cache from a fresh search scrape.
#[derive(Clone)]
pub struct RefreshJob {
    scraper: Arc<dyn Scraper>,
    live: LiveCache,
    channels: ChannelCaches,
    queues: EnrichmentQueues,
    guards: Guards,
    query: String,
    max_results: usize,
    navigation_timeout: Duration,
}

impl RefreshJob {
    pub fn new(state: &AppState) -> Self {
        Self {
            scraper: Arc::clone(&state.scraper),
            live: state.live.clone(),
            channels: state.channels.clone(),
            queues: state.queues.clone(),
            guards: state.guards.clone(),
            query: state.policy.query.clone(),
            max_results: state.policy.max_results,
            navigation_timeout: state.policy.navigation_timeout,
        }
    }

    /// Run a single guarded refresh.
    ///
    /// Holds both the refresh and session guards for the whole cycle. On
    /// failure the cache keeps its previous contents.
    #[tracing::instrument(name = "refresh", skip_all)]
    pub async fn run_once(&self) -> RefreshOutcome {
        let Some(refresh) = self.guards.refresh.try_enter() else {
            trace!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped(SkipReason::AlreadyRefreshing);
        };
        let Some(session) = self.guards.session.try_enter() else {
            debug!("Scrape session busy draining, skipping refresh");
            return RefreshOutcome::Skipped(SkipReason::SessionBusy);
        };
        let _cycle = Cycle {
            _session: session,
            _refresh: refresh,
            _attempt: self.live.begin_attempt(),
        };

        let start = Instant::now();
        match self.fetch().await {
            Ok(items) => {
                let snapshot = self.live.replace(unique_items(items, self.max_results));
                let seeded = self.queues.seed_items(&snapshot, &self.channels);
                info!(
                    items = snapshot.len(),
                    seeded_avatars = seeded.avatars,
                    seeded_subscribers = seeded.subscribers,
                    duration = fmt_duration(start.elapsed()),
                    "Live cache refreshed"
                );
                RefreshOutcome::Refreshed {
                    items: snapshot.len(),
                    seeded,
                }
            }
            Err(e) => {
                error!(
                    error_kind = e.kind(),
                    error = %e,
                    serving_items = self.live.snapshot().len(),
                    duration = fmt_duration(start.elapsed()),
                    "Refresh failed, keeping previous results"
                );
                RefreshOutcome::Failed(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<LiveItem>, ScrapeError> {
        let mut session = self.scraper.open_session().await?;
        time::timeout(
            self.navigation_timeout,
            session.search_live(&self.query, self.max_results),
        )
        .await
        .map_err(|_| ScrapeError::Timeout {
            url: format!("search:{}", self.query),
            after: self.navigation_timeout,
        })?
    }
}

/// Drop repeated video ids (first occurrence wins) and cap the list.
fn unique_items(items: Vec<LiveItem>, max_results: usize) -> Vec<LiveItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .take(max_results)
        .collect()
}
