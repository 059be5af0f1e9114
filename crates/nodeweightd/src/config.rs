//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through its environment variable.
//! [`Config::from_cli`] validates the options required by the selected mode
//! before anything is bound or spawned.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use nodeweight_agent::{DEFAULT_AGENT_PORT, DEFAULT_APP_PORT};
use nodeweight_health::client::validate_url;
use nodeweight_health::metric::{DEFAULT_METRIC, DEFAULT_THRESHOLD_MAX};
use nodeweight_health::{MetricPattern, MetricSource, Threshold, ThresholdKind};

/// Metrics port for the agent-check metric mode.
pub const DEFAULT_METRICS_PORT_AGENT: u16 = 9090;

/// Metrics port for the HTTP status-code mode.
pub const DEFAULT_METRICS_PORT_HTTP: u16 = 3737;

#[derive(Parser, Debug)]
#[command(name = "nodeweightd", version, about = "HAProxy health sidecar for blockchain nodes")]
pub struct Cli {
    /// Which source and probe transport to run.
    #[arg(long, env = "NODEWEIGHT_MODE", value_enum, default_value_t = Mode::ChainHeight)]
    pub mode: Mode,

    /// JSON-RPC URL of the monitored node.
    #[arg(long, env = "LOCAL_NODE_URL")]
    pub local_node_url: Option<String>,

    /// Comma-separated JSON-RPC URLs of reference nodes.
    #[arg(long, env = "REFERENCE_NODE_URLS", value_delimiter = ',')]
    pub reference_node_urls: Vec<String>,

    /// Port for the HAProxy agent-check listener.
    #[arg(long, env = "AGENT_LISTEN_PORT", default_value_t = DEFAULT_AGENT_PORT)]
    pub agent_listen_port: u16,

    /// Host serving the metrics endpoint.
    #[arg(long, env = "METRICS_HOSTNAME", default_value = "localhost")]
    pub metrics_hostname: String,

    /// Port of the metrics endpoint (9090 in metric-agent mode, 3737 in metric-http mode).
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Path of the metrics endpoint.
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics")]
    pub metrics_path: String,

    /// Metric to read from the metrics payload.
    #[arg(long, env = "METRIC_NAME", default_value = DEFAULT_METRIC)]
    pub metric_name: String,

    /// Threshold style: zero (value == 0) or at-most (value <= max).
    #[arg(long, env = "METRIC_THRESHOLD")]
    pub threshold: Option<ThresholdKind>,

    /// Upper bound for the at-most threshold.
    #[arg(long, env = "METRIC_THRESHOLD_MAX", default_value_t = DEFAULT_THRESHOLD_MAX)]
    pub threshold_max: i64,

    /// Port for the HTTP status endpoint.
    #[arg(long, env = "APP_LISTEN_PORT", default_value_t = DEFAULT_APP_PORT)]
    pub app_listen_port: u16,

    /// Sampling period in milliseconds (push modes).
    #[arg(long, env = "SAMPLE_INTERVAL_MS", default_value_t = 500)]
    pub sample_interval_ms: u64,

    /// Timeout for each outbound request in milliseconds.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 2000)]
    pub request_timeout_ms: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Compare chain heights, answer HAProxy agent-checks over TCP.
    ChainHeight,
    /// Threshold a metric, answer HAProxy agent-checks over TCP.
    MetricAgent,
    /// Threshold a metric on every `GET /rpc-health`.
    MetricHttp,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Startup configuration problems. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LOCAL_NODE_URL must be set in chain-height mode")]
    MissingLocalNode,

    #[error("REFERENCE_NODE_URLS must list at least one node in chain-height mode")]
    MissingReferenceNodes,

    #[error("{var} has an unusable url '{url}': {reason}")]
    InvalidUrl {
        var: &'static str,
        url: String,
        reason: String,
    },

    #[error("metric name must not be empty")]
    EmptyMetricName,

    #[error("invalid metric name '{name}': {reason}")]
    InvalidMetricName { name: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ModeConfig,
    pub sample_interval: Duration,
    pub request_timeout: Duration,
}

/// Per-mode settings.
#[derive(Debug, Clone)]
pub enum ModeConfig {
    ChainHeight {
        local_url: String,
        reference_urls: Vec<String>,
        listen: SocketAddr,
    },
    MetricAgent {
        metric: MetricConfig,
        listen: SocketAddr,
    },
    MetricHttp {
        metric: MetricConfig,
        listen: SocketAddr,
    },
}

/// Where and how to read the metric.
#[derive(Debug, Clone)]
pub struct MetricConfig {
    pub url: String,
    pub pattern: MetricPattern,
    pub threshold: Threshold,
}

impl Config {
    /// Validate parsed options for the selected mode.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.sample_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("SAMPLE_INTERVAL_MS"));
        }
        if cli.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("REQUEST_TIMEOUT_MS"));
        }

        let mode = match cli.mode {
            Mode::ChainHeight => chain_height_config(cli)?,
            Mode::MetricAgent => ModeConfig::MetricAgent {
                metric: metric_config(cli, DEFAULT_METRICS_PORT_AGENT, ThresholdKind::Zero)?,
                listen: any_addr(cli.agent_listen_port),
            },
            Mode::MetricHttp => ModeConfig::MetricHttp {
                metric: metric_config(cli, DEFAULT_METRICS_PORT_HTTP, ThresholdKind::AtMost)?,
                listen: any_addr(cli.app_listen_port),
            },
        };

        Ok(Self {
            mode,
            sample_interval: Duration::from_millis(cli.sample_interval_ms),
            request_timeout: Duration::from_millis(cli.request_timeout_ms),
        })
    }
}

fn chain_height_config(cli: &Cli) -> Result<ModeConfig, ConfigError> {
    let local_url = cli
        .local_node_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ConfigError::MissingLocalNode)?
        .to_string();
    check_url("LOCAL_NODE_URL", &local_url)?;

    let reference_urls: Vec<String> = cli
        .reference_node_urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();
    if reference_urls.is_empty() {
        return Err(ConfigError::MissingReferenceNodes);
    }
    for url in &reference_urls {
        check_url("REFERENCE_NODE_URLS", url)?;
    }

    Ok(ModeConfig::ChainHeight {
        local_url,
        reference_urls,
        listen: any_addr(cli.agent_listen_port),
    })
}

fn metric_config(
    cli: &Cli,
    default_port: u16,
    default_threshold: ThresholdKind,
) -> Result<MetricConfig, ConfigError> {
    let name = cli.metric_name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyMetricName);
    }
    let pattern = MetricPattern::new(name).map_err(|e| ConfigError::InvalidMetricName {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    let url = MetricSource::metrics_url(
        &cli.metrics_hostname,
        cli.metrics_port.unwrap_or(default_port),
        &cli.metrics_path,
    );
    check_url("METRICS_HOSTNAME", &url)?;

    let threshold = cli
        .threshold
        .unwrap_or(default_threshold)
        .with_max(cli.threshold_max);

    Ok(MetricConfig {
        url,
        pattern,
        threshold,
    })
}

fn check_url(var: &'static str, url: &str) -> Result<(), ConfigError> {
    validate_url(url).map_err(|e| ConfigError::InvalidUrl {
        var,
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn any_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}
