//! Push mode — a background sampler keeps shared state fresh and the
//! agent-check server answers every probe from it.
//!
//! In this mode, the daemon:
//! 1. Binds the agent-check listener (fails fast if the port is taken)
//! 2. Spawns the health monitor with a fresh `SharedHealth`
//! 3. Serves probes until the shutdown signal
//! 4. Waits for the monitor to stop

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info};

use nodeweight_agent::AgentServer;
use nodeweight_health::{HealthMonitor, HealthSource};
use nodeweight_state::SharedHealth;

/// Run the sampler and the agent-check server until shutdown.
pub async fn run_push<S: HealthSource>(
    source: S,
    listen: SocketAddr,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let health = SharedHealth::new();

    let server = AgentServer::bind(listen, health.clone())
        .await
        .with_context(|| format!("failed to bind agent-check listener on {listen}"))?;

    let monitor = HealthMonitor::new(source, health, interval);
    let monitor_handle = monitor.spawn(shutdown.clone());
    info!(%listen, "push mode running");

    server.serve(shutdown).await;

    if let Err(e) = monitor_handle.await {
        error!(error = %e, "health monitor task failed");
        return Err(e).context("health monitor task failed");
    }
    Ok(())
}
