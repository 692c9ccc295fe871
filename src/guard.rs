//! Process-wide single-flight flags.
//!
//! A [`SingleFlight`] admits at most one holder at a time. Entry is a
//! compare-and-swap on an `AtomicBool`; the returned [`FlightPermit`] clears
//! the flag when dropped, so the flag is released on success, on error, on an
//! early return and when the holding task is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// A named mutual-exclusion flag. Clone-cheap; clones share the flag.
#[derive(Debug, Clone)]
pub struct SingleFlight {
    name: &'static str,
    held: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Try to take the flag. Returns `None` immediately if it is held.
    pub fn try_enter(&self) -> Option<FlightPermit> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        trace!(guard = self.name, "single-flight entered");
        Some(FlightPermit {
            name: self.name,
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of holding a [`SingleFlight`]. Releases the flag on drop.
#[derive(Debug)]
#[must_use = "the flag is released as soon as the permit is dropped"]
pub struct FlightPermit {
    name: &'static str,
    held: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
        trace!(guard = self.name, "single-flight released");
    }
}

/// The process-wide guards shared by the refresh job and the drains.
#[derive(Debug, Clone)]
pub struct Guards {
    /// Held for the whole primary-cache rebuild.
    pub refresh: SingleFlight,
    /// The single upstream scrape session; held by a refresh or a drain.
    pub session: SingleFlight,
}

impl Guards {
    pub fn new() -> Self {
        Self {
            refresh: SingleFlight::new("refresh"),
            session: SingleFlight::new("session"),
        }
    }
}

impl Default for Guards {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn second_entry_is_refused_while_held() {
        let guard = SingleFlight::new("refresh");
        let permit = guard.try_enter();
        assert!(permit.is_some());
        assert!(guard.try_enter().is_none());
        assert!(guard.is_held());
    }

    #[test]
    fn released_guard_can_be_reentered() {
        let guard = SingleFlight::new("refresh");
        drop(guard.try_enter().unwrap());
        assert!(!guard.is_held());
        assert!(guard.try_enter().is_some());
    }

    #[test]
    fn clones_share_the_flag() {
        let guard = SingleFlight::new("session");
        let other = guard.clone();
        let _permit = guard.try_enter().unwrap();
        assert!(other.try_enter().is_none());
    }

    #[test]
    fn released_on_early_error_return() {
        fn guarded(guard: &SingleFlight) -> Result<(), &'static str> {
            let _permit = guard.try_enter().ok_or("busy")?;
            Err("upstream failed")
        }

        let guard = SingleFlight::new("session");
        assert_eq!(guarded(&guard), Err("upstream failed"));
        assert!(!guard.is_held());
    }

    #[tokio::test]
    async fn released_when_holding_task_is_aborted() {
        let guard = SingleFlight::new("session");
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn({
            let guard = guard.clone();
            async move {
                let _permit = guard.try_enter().unwrap();
                let _ = entered_tx.send(());
                std::future::pending::<()>().await;
            }
        });

        entered_rx.await.unwrap();
        assert!(guard.is_held());
        task.abort();
        let _ = task.await;
        assert!(!guard.is_held());
    }

    #[test]
    fn never_grants_two_concurrent_holders() {
        let guard = SingleFlight::new("refresh");
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        if let Some(_permit) = guard.try_enter() {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::hint::spin_loop();
                            active.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(!guard.is_held());
    }
}
