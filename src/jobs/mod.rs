//! Background jobs: the periodic live-cache refresh and the enrichment drains.

pub mod refresh;
pub mod scheduler;

pub use refresh::{RefreshJob, RefreshOutcome, SkipReason};
pub use scheduler::Scheduler;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::services::Service;
use crate::state::AppState;

/// Timing and sizing knobs for the refresh and drain jobs.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub query: String,
    pub max_results: usize,
    pub refresh_interval: Duration,
    pub drain_check_interval: Duration,
    /// Pause between two keys of one drain.
    pub drain_item_delay: Duration,
    /// Upper bound on a single upstream page load.
    pub navigation_timeout: Duration,
    /// How long a request waits for the very first refresh.
    pub cold_start_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            query: "soulcity".to_string(),
            max_results: 50,
            refresh_interval: Duration::from_secs(5 * 60),
            drain_check_interval: Duration::from_secs(10),
            drain_item_delay: Duration::from_secs(1),
            navigation_timeout: Duration::from_secs(5),
            cold_start_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs the [`Scheduler`] as a managed service.
pub struct JobsService {
    state: AppState,
}

impl JobsService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Service for JobsService {
    fn name(&self) -> &'static str {
        "jobs"
    }

    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        Scheduler::new(self.state.clone()).run(shutdown_rx).await;
        Ok(())
    }
}
