//! Timers driving the refresh cycle and the enrichment drains.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::enrich::EnrichmentWorker;
use crate::jobs::RefreshJob;
use crate::state::AppState;
use crate::utils::fmt_duration;

/// How long in-flight work gets to wind down after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A spawned unit of background work that can be cancelled.
struct Work {
    label: &'static str,
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Work {
    fn spawn<F>(label: &'static str, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    _ = work => {}
                    _ = cancel.cancelled() => {
                        trace!(work = label, "Work cancelled gracefully");
                    }
                }
            }
        });
        Self {
            label,
            handle,
            cancel,
        }
    }

    fn is_running(work: &Option<Work>) -> bool {
        work.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        if time::timeout(SHUTDOWN_GRACE, self.handle).await.is_err() {
            warn!(work = self.label, "Work did not complete within grace period, abandoning");
        }
    }
}

/// Ticks the refresh job every `refresh_interval` (first tick immediately)
/// and checks the pending sets every `drain_check_interval`.
///
/// Ticks are never queued: a tick that finds its previous run unfinished
/// does nothing.
pub struct Scheduler {
    state: AppState,
    refresh: RefreshJob,
    worker: EnrichmentWorker,
}

impl Scheduler {
    pub fn new(state: AppState) -> Self {
        let refresh = RefreshJob::new(&state);
        let worker = EnrichmentWorker::from_state(&state);
        Self {
            state,
            refresh,
            worker,
        }
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let policy = &self.state.policy;
        info!(
            query = %policy.query,
            refresh_interval = fmt_duration(policy.refresh_interval),
            drain_check_interval = fmt_duration(policy.drain_check_interval),
            "Scheduler started"
        );

        let mut refresh_ticker = time::interval(policy.refresh_interval);
        refresh_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut drain_ticker = time::interval_at(
            time::Instant::now() + policy.drain_check_interval,
            policy.drain_check_interval,
        );
        drain_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut refresh_work: Option<Work> = None;
        let mut drain_work: Option<Work> = None;

        loop {
            tokio::select! {
                _ = refresh_ticker.tick() => {
                    if Work::is_running(&refresh_work) {
                        trace!("Previous refresh still running, skipping tick");
                        continue;
                    }
                    let job = self.refresh.clone();
                    refresh_work = Some(Work::spawn("refresh", async move {
                        job.run_once().await;
                    }));
                }
                _ = drain_ticker.tick() => {
                    if Work::is_running(&drain_work) || !self.state.queues.has_pending() {
                        continue;
                    }
                    if self.state.guards.session.is_held() {
                        trace!("Scrape session busy, deferring drain");
                        continue;
                    }
                    let worker = self.worker.clone();
                    drain_work = Some(Work::spawn("drain", async move {
                        worker.drain_all().await;
                    }));
                }
                _ = shutdown_rx.recv() => {
                    info!("Scheduler received shutdown signal");
                    for work in [refresh_work.take(), drain_work.take()].into_iter().flatten() {
                        work.shutdown().await;
                    }
                    info!("Scheduler exiting gracefully");
                    break;
                }
            }
        }
    }
}
