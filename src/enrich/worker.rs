//! Drains an enrichment queue one channel at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::cache::ChannelCaches;
use crate::enrich::{EnrichmentKind, EnrichmentQueues};
use crate::guard::SingleFlight;
use crate::scraper::{ScrapeError, ScrapeSession, Scraper};
use crate::state::AppState;
use crate::utils::fmt_duration;

/// Per-key results of a completed drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Keys whose value was written to the auxiliary cache.
    pub succeeded: usize,
    /// Keys the page had no value for.
    pub empty: usize,
    /// Keys skipped after a recoverable error.
    pub failed: usize,
}

#[derive(Debug)]
pub enum DrainOutcome {
    /// Nothing was pending.
    Idle,
    /// Another refresh or drain holds the session.
    Busy,
    /// The session could not be obtained or died; `remaining` keys stay pending.
    Aborted {
        error: ScrapeError,
        stats: DrainStats,
        remaining: usize,
    },
    Completed(DrainStats),
}

/// Drains the enrichment queues into the channel caches.
#[derive(Clone)]
pub struct EnrichmentWorker {
    scraper: Arc<dyn Scraper>,
    queues: EnrichmentQueues,
    caches: ChannelCaches,
    session_guard: SingleFlight,
    item_delay: Duration,
    navigation_timeout: Duration,
}

impl EnrichmentWorker {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        queues: EnrichmentQueues,
        caches: ChannelCaches,
        session_guard: SingleFlight,
        item_delay: Duration,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            scraper,
            queues,
            caches,
            session_guard,
            item_delay,
            navigation_timeout,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.scraper),
            state.queues.clone(),
            state.channels.clone(),
            state.guards.session.clone(),
            state.policy.drain_item_delay,
            state.policy.navigation_timeout,
        )
    }

    /// Drain avatars, then subscriber counts. Stops at the first kind that
    /// could not get or keep the session.
    pub async fn drain_all(&self) {
        for kind in EnrichmentKind::ALL {
            match self.drain(kind).await {
                DrainOutcome::Busy | DrainOutcome::Aborted { .. } => break,
                DrainOutcome::Idle | DrainOutcome::Completed(_) => {}
            }
        }
    }

    /// Process every pending key of `kind` under the session guard.
    ///
    /// Per-key failures are logged and skipped; only a fatal session error
    /// stops the drain early.
    pub async fn drain(&self, kind: EnrichmentKind) -> DrainOutcome {
        let pending = self.queues.pending(kind);
        if pending.is_empty() {
            return DrainOutcome::Idle;
        }

        let Some(_permit) = self.session_guard.try_enter() else {
            debug!(kind = %kind, "Session busy, drain deferred");
            return DrainOutcome::Busy;
        };

        let mut session = match self.scraper.open_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(kind = %kind, error = %e, "Failed to open session for drain");
                return DrainOutcome::Aborted {
                    error: e,
                    stats: DrainStats::default(),
                    remaining: pending.len(),
                };
            }
        };

        let start = Instant::now();
        let mut stats = DrainStats::default();
        debug!(kind = %kind, pending = pending.len(), "Draining enrichment queue");

        while let Some(channel_id) = pending.front() {
            match self.enrich_one(&mut session, kind, &channel_id).await {
                Ok(true) => stats.succeeded += 1,
                Ok(false) => {
                    debug!(kind = %kind, channel_id, "No value found for channel");
                    stats.empty += 1;
                }
                Err(e) if e.is_fatal() => {
                    error!(kind = %kind, channel_id, error = %e, "Session lost, aborting drain");
                    return DrainOutcome::Aborted {
                        error: e,
                        stats,
                        remaining: pending.len(),
                    };
                }
                Err(e) => {
                    warn!(
                        kind = %kind,
                        channel_id,
                        error_kind = e.kind(),
                        error = %e,
                        "Failed to enrich channel, skipping"
                    );
                    stats.failed += 1;
                }
            }

            pending.remove(&channel_id);
            if !pending.is_empty() {
                time::sleep(self.item_delay).await;
            }
        }

        info!(
            kind = %kind,
            succeeded = stats.succeeded,
            empty = stats.empty,
            failed = stats.failed,
            duration = fmt_duration(start.elapsed()),
            "Enrichment queue drained"
        );
        DrainOutcome::Completed(stats)
    }

    /// Fetch one value and cache it. `Ok(false)` when the page had none.
    async fn enrich_one(
        &self,
        session: &mut Box<dyn ScrapeSession>,
        kind: EnrichmentKind,
        channel_id: &str,
    ) -> Result<bool, ScrapeError> {
        let after = self.navigation_timeout;
        let timed_out = |_| ScrapeError::Timeout {
            url: channel_id.to_string(),
            after,
        };

        match kind {
            EnrichmentKind::Avatar => {
                let avatar = time::timeout(after, session.channel_avatar(channel_id))
                    .await
                    .map_err(timed_out)??;
                let Some(url) = avatar else {
                    return Ok(false);
                };
                self.caches.avatars.set(channel_id.to_string(), url);
            }
            EnrichmentKind::SubscriberCount => {
                let count = time::timeout(after, session.subscriber_count(channel_id))
                    .await
                    .map_err(timed_out)??;
                let Some(count) = count.filter(|&c| c > 0) else {
                    return Ok(false);
                };
                self.caches.subscribers.set(channel_id.to_string(), count);
            }
        }
        Ok(true)
    }
}
