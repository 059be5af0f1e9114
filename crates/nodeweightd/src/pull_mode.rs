//! Pull mode — no background sampler; each `GET /rpc-health` samples the
//! source once and answers with a status code.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use nodeweight_agent::{serve_status, status_router};
use nodeweight_health::HealthSource;

/// Serve the HTTP status endpoint until shutdown.
pub async fn run_pull<S: HealthSource>(
    source: S,
    listen: SocketAddr,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind status endpoint on {listen}"))?;

    serve_status(listener, status_router(Arc::new(source)), shutdown)
        .await
        .context("status endpoint failed")
}
