use anyhow::Context;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, trace};

use crate::services::Service;
use crate::state::AppState;
use crate::web::create_router;
use crate::web::middleware::rate_limit::RateLimitState;

/// Serves the HTTP API until shutdown.
pub struct WebService {
    port: u16,
    app_state: AppState,
    rate_limit_per_minute: u32,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState, rate_limit_per_minute: u32) -> Self {
        Self {
            port,
            app_state,
            rate_limit_per_minute,
        }
    }
}

#[async_trait]
impl Service for WebService {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let rate_limit = Arc::new(RateLimitState::new(self.rate_limit_per_minute));
        let app = create_router(self.app_state.clone(), rate_limit);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(
            address = %addr,
            link = format!("http://localhost:{}", self.port),
            rate_limit_per_minute = self.rate_limit_per_minute,
            "web server listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            trace!("web server received shutdown signal");
        })
        .await
        .context("web server error")?;

        info!("web server stopped");
        Ok(())
    }
}
