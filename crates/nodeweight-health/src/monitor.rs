//! Health monitor — the background sampler loop.
//!
//! Samples the configured source, publishes the result into
//! [`SharedHealth`], then sleeps for the interval. The sleep starts after
//! the sample finishes, so a slow fetch stretches the period instead of
//! causing back-to-back samples.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use nodeweight_state::{HealthVerdict, SharedHealth};

use crate::source::HealthSource;

/// Sampling period used when none is configured.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Owns a health source and writes its samples into shared state.
///
/// The monitor is the only writer of the [`SharedHealth`] it was built with.
pub struct HealthMonitor<S> {
    source: S,
    health: SharedHealth,
    interval: Duration,
}

impl<S: HealthSource> HealthMonitor<S> {
    /// Create a new monitor.
    pub fn new(source: S, health: SharedHealth, interval: Duration) -> Self {
        Self {
            source,
            health,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take one sample and publish it. Returns the published verdict.
    pub async fn sample_once(&self) -> HealthVerdict {
        let sample = self.source.sample().await;
        let verdict = sample.verdict.clone();
        self.health.publish(sample.into_snapshot()).await;
        verdict
    }

    /// Run the sampling loop until `shutdown` flips to `true` or its sender
    /// is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            "health monitor started"
        );

        let mut last: Option<HealthVerdict> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let verdict = self.sample_once().await;
            if last.as_ref() != Some(&verdict) {
                info!(
                    source = self.source.name(),
                    status = %verdict,
                    previous = %last.as_ref().map(|v| v.status_line()).unwrap_or("none"),
                    "health verdict changed"
                );
            } else {
                debug!(source = self.source.name(), status = %verdict, "health verdict unchanged");
            }
            last = Some(verdict);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    debug!("health monitor received shutdown");
                    break;
                }
            }
        }

        info!(source = self.source.name(), "health monitor stopped");
    }

    /// Spawn [`run`](Self::run) on the runtime.
    ///
    /// The task lives until shutdown or process exit; joining the handle is
    /// optional.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
