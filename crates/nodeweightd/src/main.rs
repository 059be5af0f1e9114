//! nodeweightd — HAProxy health sidecar for blockchain nodes.
//!
//! Single binary, one mode per deployment:
//! - `chain-height`: sample local vs. reference node heights, answer
//!   agent-checks over TCP
//! - `metric-agent`: sample a metrics endpoint, answer agent-checks over TCP
//! - `metric-http`: sample the metrics endpoint on every `GET /rpc-health`
//!
//! # Usage
//!
//! ```text
//! LOCAL_NODE_URL=http://127.0.0.1:8545 \
//! REFERENCE_NODE_URLS=http://ref-a:8545,http://ref-b:8545 \
//! nodeweightd
//! ```

mod config;
mod pull_mode;
mod push_mode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nodeweight_health::{ChainHeightSource, MetricSource, NodeClient};

use crate::config::{Cli, Config, LogFormat, ModeConfig};

const DEFAULT_LOG_FILTER: &str = "info,nodeweightd=debug,nodeweight=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    info!(
        mode = ?cli.mode,
        sample_interval_ms = config.sample_interval.as_millis() as u64,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "nodeweight daemon starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(shutdown_tx));

    run(config, shutdown_rx).await?;

    info!("nodeweight daemon stopped");
    Ok(())
}

async fn run(config: Config, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let client = NodeClient::new(config.request_timeout);

    match config.mode {
        ModeConfig::ChainHeight {
            local_url,
            reference_urls,
            listen,
        } => {
            info!(%local_url, references = reference_urls.len(), "chain-height source");
            let source = ChainHeightSource::new(client, local_url, reference_urls);
            push_mode::run_push(source, listen, config.sample_interval, shutdown).await
        }
        ModeConfig::MetricAgent { metric, listen } => {
            info!(
                url = %metric.url,
                metric = metric.pattern.name(),
                threshold = %metric.threshold,
                "metric source"
            );
            let source = MetricSource::new(client, metric.url, metric.pattern, metric.threshold);
            push_mode::run_push(source, listen, config.sample_interval, shutdown).await
        }
        ModeConfig::MetricHttp { metric, listen } => {
            info!(
                url = %metric.url,
                metric = metric.pattern.name(),
                threshold = %metric.threshold,
                "metric source"
            );
            let source = MetricSource::new(client, metric.url, metric.pattern, metric.threshold);
            pull_mode::run_pull(source, listen, shutdown).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Flip `tx` on ctrl-c (or SIGTERM on unix).
///
/// Keeps `tx` alive forever if no signal can be installed, since dropping
/// it would stop every task watching it.
async fn forward_shutdown(tx: watch::Sender<bool>) {
    match wait_for_signal().await {
        Ok(()) => {
            info!("shutdown signal received");
            let _ = tx.send(true);
        }
        Err(e) => {
            warn!(error = %e, "cannot install signal handler, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
