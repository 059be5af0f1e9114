//! Health sources — strategies that turn a remote endpoint into a verdict.
//!
//! A source never fails: every fetch or parse error is logged and folded
//! into the verdict it returns. Each network call is bounded by the
//! [`NodeClient`] timeout, so one `sample()` never hangs.

use std::future::Future;

use futures_util::future::join_all;
use tracing::{debug, warn};

use nodeweight_state::{HealthSnapshot, HealthVerdict, WEIGHT_DEGRADED, WEIGHT_FULL};

use crate::client::NodeClient;
use crate::error::{FetchResult, ParseError};
use crate::metric::{MetricPattern, Threshold};
use crate::rpc::fetch_block_number;

/// Outcome of one sampling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub verdict: HealthVerdict,
    pub local_height: i64,
    pub highest_reference_height: i64,
}

impl Sample {
    /// A sample carrying only a verdict.
    pub fn verdict(verdict: HealthVerdict) -> Self {
        Self {
            verdict,
            local_height: 0,
            highest_reference_height: 0,
        }
    }

    /// The "down" sample written after a failed cycle.
    pub fn down() -> Self {
        Self::verdict(HealthVerdict::down())
    }

    /// Stamp the sample into a publishable snapshot.
    pub fn into_snapshot(self) -> HealthSnapshot {
        HealthSnapshot::with_heights(self.verdict, self.local_height, self.highest_reference_height)
    }
}

/// A strategy that produces a health verdict.
pub trait HealthSource: Send + Sync + 'static {
    /// Take one sample. Never returns an error.
    fn sample(&self) -> impl Future<Output = Sample> + Send;

    /// Short label for log lines.
    fn name(&self) -> &'static str;
}

// ── Chain height ──────────────────────────────────────────────────

/// Verdict for a node at `local` when the best reference is at `highest`.
pub fn weigh_heights(local: i64, highest: i64) -> HealthVerdict {
    if local >= highest {
        HealthVerdict::up(WEIGHT_FULL)
    } else {
        HealthVerdict::up(WEIGHT_DEGRADED)
    }
}

/// Highest height among references that answered; 0 if none did.
pub fn highest_height<I>(heights: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    heights.into_iter().flatten().fold(0, i64::max)
}

/// Compares the monitored node's height with a set of reference nodes.
#[derive(Debug, Clone)]
pub struct ChainHeightSource {
    client: NodeClient,
    local_url: String,
    reference_urls: Vec<String>,
}

impl ChainHeightSource {
    pub fn new(client: NodeClient, local_url: String, reference_urls: Vec<String>) -> Self {
        Self {
            client,
            local_url,
            reference_urls,
        }
    }

    pub fn local_url(&self) -> &str {
        &self.local_url
    }

    pub fn reference_urls(&self) -> &[String] {
        &self.reference_urls
    }

    async fn reference_height(&self, url: &str) -> Option<i64> {
        match fetch_block_number(&self.client, url).await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!(%url, error = %e, "reference node unavailable, skipping");
                None
            }
        }
    }
}

impl HealthSource for ChainHeightSource {
    async fn sample(&self) -> Sample {
        let local = match fetch_block_number(&self.client, &self.local_url).await {
            Ok(height) => height,
            Err(e) => {
                warn!(url = %self.local_url, error = %e, "local node unavailable, marking down");
                return Sample::down();
            }
        };

        let heights = join_all(
            self.reference_urls
                .iter()
                .map(|url| self.reference_height(url)),
        )
        .await;
        let highest = highest_height(heights);

        let verdict = weigh_heights(local, highest);
        debug!(local, highest, status = %verdict, "chain height sampled");
        Sample {
            verdict,
            local_height: local,
            highest_reference_height: highest,
        }
    }

    fn name(&self) -> &'static str {
        "chain-height"
    }
}

// ── Metric threshold ──────────────────────────────────────────────

/// Reads one integer metric from a metrics endpoint and thresholds it.
#[derive(Debug, Clone)]
pub struct MetricSource {
    client: NodeClient,
    url: String,
    pattern: MetricPattern,
    threshold: Threshold,
}

impl MetricSource {
    pub fn new(
        client: NodeClient,
        url: String,
        pattern: MetricPattern,
        threshold: Threshold,
    ) -> Self {
        Self {
            client,
            url,
            pattern,
            threshold,
        }
    }

    /// Metrics URL for `host:port` with the given path.
    pub fn metrics_url(host: &str, port: u16, path: &str) -> String {
        let path = path.trim();
        if path.starts_with('/') {
            format!("http://{host}:{port}{path}")
        } else {
            format!("http://{host}:{port}/{path}")
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Fetch and parse the configured metric.
    pub async fn read_metric(&self) -> FetchResult<i64> {
        let body = self.client.get(&self.url).await?;
        let text = std::str::from_utf8(&body).map_err(|_| ParseError::Utf8)?;
        Ok(self.pattern.extract(text)?)
    }
}

impl HealthSource for MetricSource {
    async fn sample(&self) -> Sample {
        match self.read_metric().await {
            Ok(value) => {
                let verdict = self.threshold.evaluate(value);
                debug!(
                    metric = self.pattern.name(),
                    value,
                    threshold = %self.threshold,
                    status = %verdict,
                    "metric sampled"
                );
                Sample::verdict(verdict)
            }
            Err(e) => {
                warn!(
                    url = %self.url,
                    metric = self.pattern.name(),
                    error = %e,
                    "metric unavailable, marking down"
                );
                Sample::down()
            }
        }
    }

    fn name(&self) -> &'static str {
        "metric"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::metric::DEFAULT_METRIC;
    use crate::test_support::{spawn_metrics_endpoint, spawn_rpc_node};

    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn client() -> NodeClient {
        NodeClient::new(Duration::from_millis(500))
    }

    fn chain(local: String, refs: Vec<String>) -> ChainHeightSource {
        ChainHeightSource::new(client(), local, refs)
    }

    fn metric(url: String, threshold: Threshold) -> MetricSource {
        MetricSource::new(client(), url, MetricPattern::new(DEFAULT_METRIC).unwrap(), threshold)
    }

    #[test]
    fn weigh_heights_table() {
        assert_eq!(weigh_heights(100, 50).status_line(), "up weight=100");
        assert_eq!(weigh_heights(100, 100).status_line(), "up weight=100");
        assert_eq!(weigh_heights(99, 100).status_line(), "up weight=50");
        assert!(weigh_heights(0, 1).healthy());
    }

    #[test]
    fn failed_references_are_excluded_from_max() {
        assert_eq!(highest_height([Some(10), None, Some(30), None]), 30);
        assert_eq!(highest_height([None, None]), 0);
        assert_eq!(highest_height(std::iter::empty()), 0);
    }

    #[tokio::test]
    async fn local_ahead_of_reference_is_full_weight() {
        let local = spawn_rpc_node("0x64").await;
        let reference = spawn_rpc_node("0x32").await;

        let sample = chain(local, vec![reference]).sample().await;
        assert_eq!(sample.verdict.status_line(), "up weight=100");
        assert_eq!(sample.local_height, 100);
        assert_eq!(sample.highest_reference_height, 50);
    }

    #[tokio::test]
    async fn local_behind_highest_reference_is_degraded() {
        let local = spawn_rpc_node("0x64").await;
        let low = spawn_rpc_node("0x32").await;
        let high = spawn_rpc_node("0x65").await;

        let sample = chain(local, vec![low, high]).sample().await;
        assert_eq!(sample.verdict.status_line(), "up weight=50");
        assert!(sample.verdict.healthy());
        assert_eq!(sample.highest_reference_height, 101);
    }

    #[tokio::test]
    async fn unreachable_local_is_down() {
        let reference = spawn_rpc_node("0x32").await;
        let sample = chain(UNREACHABLE.to_string(), vec![reference]).sample().await;
        assert_eq!(sample, Sample::down());
        assert_eq!(sample.verdict.status_line(), "down");
    }

    #[tokio::test]
    async fn unreachable_reference_is_skipped() {
        let local = spawn_rpc_node("0x10").await;
        let reference = spawn_rpc_node("0x20").await;

        let sample = chain(local, vec![UNREACHABLE.to_string(), reference]).sample().await;
        assert_eq!(sample.highest_reference_height, 32);
        assert_eq!(sample.verdict.status_line(), "up weight=50");
    }

    #[tokio::test]
    async fn all_references_failing_counts_as_zero() {
        let local = spawn_rpc_node("0x10").await;
        let broken = spawn_rpc_node("not-hex").await;

        let sample = chain(local, vec![UNREACHABLE.to_string(), broken]).sample().await;
        assert_eq!(sample.highest_reference_height, 0);
        assert_eq!(sample.verdict.status_line(), "up weight=100");
    }

    #[tokio::test]
    async fn metric_zero_is_healthy_under_both_policies() {
        let url = spawn_metrics_endpoint("sync_execution_network_diff 0\n").await;

        let eq = metric(url.clone(), Threshold::EqualsZero).sample().await;
        assert!(eq.verdict.healthy());
        assert_eq!(eq.verdict.weight(), 100);

        let range = metric(url, Threshold::AtMost(2)).sample().await;
        assert!(range.verdict.healthy());
    }

    #[tokio::test]
    async fn metric_seven_is_unhealthy_under_both_policies() {
        let url = spawn_metrics_endpoint("sync_execution_network_diff 7\n").await;

        let eq = metric(url.clone(), Threshold::EqualsZero).sample().await;
        assert!(!eq.verdict.healthy());
        assert_eq!(eq.verdict.weight(), 50);

        let range = metric(url, Threshold::AtMost(2)).sample().await;
        assert!(!range.verdict.healthy());
    }

    #[tokio::test]
    async fn missing_metric_is_down() {
        let url = spawn_metrics_endpoint("some_other_metric 0\n").await;
        let sample = metric(url, Threshold::EqualsZero).sample().await;
        assert_eq!(sample.verdict.weight(), 0);
        assert!(!sample.verdict.healthy());
    }

    #[tokio::test]
    async fn metrics_served_with_non_200_status_is_down() {
        use axum::Router;
        use axum::http::StatusCode;
        use axum::routing::get;

        use crate::test_support::spawn_server;

        let addr = spawn_server(Router::new().route(
            "/metrics",
            get(|| async { (StatusCode::PARTIAL_CONTENT, "sync_execution_network_diff 0\n") }),
        ))
        .await;
        let sample = metric(format!("http://{addr}/metrics"), Threshold::AtMost(2))
            .sample()
            .await;
        assert_eq!(sample, Sample::down());
    }

    #[tokio::test]
    async fn unreachable_metrics_endpoint_is_down() {
        let sample = metric(format!("{UNREACHABLE}/metrics"), Threshold::AtMost(2))
            .sample()
            .await;
        assert_eq!(sample, Sample::down());
    }

    #[test]
    fn metrics_url_joins_path() {
        assert_eq!(
            MetricSource::metrics_url("localhost", 9090, "/metrics"),
            "http://localhost:9090/metrics"
        );
        assert_eq!(
            MetricSource::metrics_url("10.0.0.2", 3737, "metrics"),
            "http://10.0.0.2:3737/metrics"
        );
    }
}
