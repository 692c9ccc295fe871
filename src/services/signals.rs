use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::services::manager::ServiceManager;
use crate::utils::fmt_duration;

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Run until a shutdown signal arrives or a service exits, then stop every
/// service within `shutdown_timeout`.
pub async fn handle_shutdown_signals(
    mut manager: ServiceManager,
    shutdown_timeout: Duration,
) -> ExitCode {
    let mut exit_code = ExitCode::SUCCESS;

    tokio::select! {
        exited = manager.wait_for_exit() => match exited {
            Some((name, Ok(()))) => {
                warn!(service = %name, "service exited unexpectedly, shutting down");
                exit_code = ExitCode::FAILURE;
            }
            Some((name, Err(e))) => {
                error!(service = %name, error = ?e, "service failed, shutting down");
                exit_code = ExitCode::FAILURE;
            }
            None => warn!("no services running"),
        },
        _ = ctrl_c() => info!("received Ctrl+C, shutting down"),
        _ = terminate() => info!("received SIGTERM, shutting down"),
    }

    info!(timeout = fmt_duration(shutdown_timeout), "stopping services");
    match manager.shutdown(shutdown_timeout).await {
        Ok(_) => info!("graceful shutdown complete"),
        Err(pending) => {
            warn!(pending_services = ?pending, "shutdown timed out, services aborted");
            exit_code = ExitCode::FAILURE;
        }
    }

    exit_code
}
