//! The primary live-items cache and its stale backup.
//!
//! The whole result set lives under a single key as one `Arc<Vec<_>>`, so a
//! refresh swaps it in one write and readers never see a mix of two cycles.
//! Successful refreshes are published on one `watch` channel so the read path
//! can tell "never refreshed" apart from "refreshed, found nothing". Every
//! finished cycle, failed or not, bumps a second counter that cold-start
//! readers wait on.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cache::ttl::TtlCache;
use crate::scraper::LiveItem;

const LIVE_KEY: &str = "live_items";

pub type LiveSnapshot = Arc<Vec<LiveItem>>;

/// Bookkeeping for the most recent successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStamp {
    pub at: DateTime<Utc>,
    pub items: usize,
}

/// Shared live cache handle. Clone-cheap.
#[derive(Debug, Clone)]
pub struct LiveCache {
    current: TtlCache<&'static str, LiveSnapshot>,
    /// Last successful snapshot, kept for diagnostics only; the read path
    /// never serves from it.
    stale: TtlCache<&'static str, LiveSnapshot>,
    refreshed: Arc<watch::Sender<Option<RefreshStamp>>>,
    /// Finished refresh cycles, successful or not.
    attempts: Arc<watch::Sender<u64>>,
    /// When a reader last started a refresh of its own.
    read_refresh: Arc<Mutex<Option<Instant>>>,
}

/// Marks one refresh cycle as running; dropping it publishes the cycle as
/// finished, also when the cycle is cancelled.
#[derive(Debug)]
pub struct RefreshAttempt {
    attempts: Arc<watch::Sender<u64>>,
}

impl Drop for RefreshAttempt {
    fn drop(&mut self) {
        self.attempts.send_modify(|n| *n += 1);
    }
}

impl LiveCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        let (refreshed, _) = watch::channel(None);
        let (attempts, _) = watch::channel(0);
        Self {
            current: TtlCache::new(ttl),
            stale: TtlCache::permanent(),
            refreshed: Arc::new(refreshed),
            attempts: Arc::new(attempts),
            read_refresh: Arc::new(Mutex::new(None)),
        }
    }

    /// The current result set; empty if nothing is cached.
    pub fn snapshot(&self) -> LiveSnapshot {
        self.current.get(&LIVE_KEY).unwrap_or_default()
    }

    pub fn stale_snapshot(&self) -> LiveSnapshot {
        self.stale.get(&LIVE_KEY).unwrap_or_default()
    }

    /// Atomically replace the served result set and record the refresh.
    pub fn replace(&self, items: Vec<LiveItem>) -> LiveSnapshot {
        let snapshot: LiveSnapshot = Arc::new(items);
        self.stale.replace_all([(LIVE_KEY, Arc::clone(&snapshot))]);
        self.current.replace_all([(LIVE_KEY, Arc::clone(&snapshot))]);
        self.refreshed.send_replace(Some(RefreshStamp {
            at: Utc::now(),
            items: snapshot.len(),
        }));
        snapshot
    }

    /// Whether any refresh has completed since startup.
    pub fn has_refreshed(&self) -> bool {
        self.refreshed.borrow().is_some()
    }

    pub fn last_refresh(&self) -> Option<RefreshStamp> {
        *self.refreshed.borrow()
    }

    /// Number of refresh cycles that have finished so far.
    pub fn attempts(&self) -> u64 {
        *self.attempts.borrow()
    }

    pub fn begin_attempt(&self) -> RefreshAttempt {
        RefreshAttempt {
            attempts: Arc::clone(&self.attempts),
        }
    }

    /// Wait up to `timeout` for a cycle to finish after `seen` had.
    /// Returns `false` on timeout.
    pub async fn wait_for_attempt_after(&self, seen: u64, timeout: Duration) -> bool {
        let mut rx = self.attempts.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|&n| n > seen)).await;
        matches!(waited, Ok(Ok(_)))
    }

    /// Claim the right for a reader to start a refresh. Granted at most once
    /// per `min_gap`.
    pub fn claim_read_refresh(&self, min_gap: Duration) -> bool {
        let mut last = self
            .read_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if last.is_some_and(|at| now.duration_since(at) < min_gap) {
            return false;
        }
        *last = Some(now);
        true
    }
}
