//! Long-running services and their lifecycle.

use async_trait::async_trait;
use tokio::sync::broadcast;

pub mod manager;
pub mod signals;
pub mod web;

/// A long-running component owned by the [`manager::ServiceManager`].
///
/// `run` should return once `shutdown_rx` fires. Returning earlier is treated
/// as the service exiting on its own, which brings the whole process down.
#[async_trait]
pub trait Service: Send {
    fn name(&self) -> &'static str;

    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()>;
}
