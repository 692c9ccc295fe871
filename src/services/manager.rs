use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::services::Service;
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use crate::utils::fmt_duration;

/// How a service task ended.
pub type ServiceExit = (String, anyhow::Result<()>);

/// Owns registered services, spawns them, and coordinates their shutdown.
pub struct ServiceManager {
    registered: Vec<(String, Box<dyn Service>)>,
    running: JoinSet<ServiceExit>,
    running_names: BTreeSet<String>,
    shutdown_tx: broadcast::Sender<()>,
    statuses: ServiceStatusRegistry,
}

impl ServiceManager {
    pub fn new(statuses: ServiceStatusRegistry) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: Vec::new(),
            running: JoinSet::new(),
            running_names: BTreeSet::new(),
            shutdown_tx,
            statuses,
        }
    }

    pub fn register_service(&mut self, name: &str, service: Box<dyn Service>) {
        self.statuses.set(name, ServiceStatus::Starting);
        self.registered.push((name.to_owned(), service));
    }

    /// Spawn every registered service on its own task.
    pub fn spawn_all(&mut self) {
        for (name, mut service) in self.registered.drain(..) {
            let shutdown_rx = self.shutdown_tx.subscribe();
            let statuses = self.statuses.clone();
            statuses.set(&name, ServiceStatus::Active);
            self.running_names.insert(name.clone());
            debug!(service = %name, kind = service.name(), "spawning service");

            self.running.spawn(async move {
                let result = service.run(shutdown_rx).await;
                let status = match &result {
                    Ok(()) => ServiceStatus::Disabled,
                    Err(_) => ServiceStatus::Error,
                };
                statuses.set(&name, status);
                (name, result)
            });
        }
        info!(services = ?self.running_names, "services started");
    }

    /// Wait for the first service to exit. `None` when nothing is running.
    pub async fn wait_for_exit(&mut self) -> Option<ServiceExit> {
        match self.running.join_next().await? {
            Ok((name, result)) => {
                self.running_names.remove(&name);
                Some((name, result))
            }
            Err(e) => {
                error!(error = %e, "service task panicked");
                Some(("unknown".to_owned(), Err(anyhow::anyhow!(e))))
            }
        }
    }

    /// Signal every service to stop and wait up to `timeout` for them.
    ///
    /// Returns the elapsed time on a clean shutdown, or the names of services
    /// that were still running when the timeout hit (they are aborted).
    pub async fn shutdown(mut self, timeout: Duration) -> Result<Duration, Vec<String>> {
        let start = Instant::now();
        // No receivers left is fine: every service already exited.
        let _ = self.shutdown_tx.send(());

        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.running.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => {
                        debug!(service = %name, "service stopped");
                        self.running_names.remove(&name);
                    }
                    Ok((name, Err(e))) => {
                        warn!(service = %name, error = ?e, "service stopped with error");
                        self.running_names.remove(&name);
                    }
                    Err(e) => error!(error = %e, "service task panicked during shutdown"),
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!(elapsed = fmt_duration(start.elapsed()), "all services stopped");
                Ok(start.elapsed())
            }
            Err(_) => {
                self.running.abort_all();
                Err(self.running_names.into_iter().collect())
            }
        }
    }
}
