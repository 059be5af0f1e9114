//! Domain types for health verdicts and snapshots.

use std::fmt;
use std::time::SystemTime;

/// Full traffic share for a node that is in sync.
pub const WEIGHT_FULL: u8 = 100;

/// Reduced traffic share for a node that is serving but lagging.
pub const WEIGHT_DEGRADED: u8 = 50;

/// Upper bound accepted by HAProxy's agent-check weight.
const WEIGHT_MAX: u8 = 100;

// ── Verdict ───────────────────────────────────────────────────────

/// The health verdict produced by one sampling cycle.
///
/// The status line is rendered once at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    healthy: bool,
    weight: u8,
    status_line: String,
}

impl HealthVerdict {
    /// A healthy node receiving `weight` percent of traffic.
    pub fn up(weight: u8) -> Self {
        Self::new(true, weight)
    }

    /// An unhealthy node that still reports a nonzero weight.
    pub fn degraded(weight: u8) -> Self {
        Self::new(false, weight)
    }

    /// A node that must not receive traffic.
    pub fn down() -> Self {
        Self::new(false, 0)
    }

    fn new(healthy: bool, weight: u8) -> Self {
        let weight = weight.min(WEIGHT_MAX);
        let status_line = match (healthy, weight) {
            (true, w) => format!("up weight={w}"),
            (false, 0) => "down".to_string(),
            (false, w) => format!("down weight={w}"),
        };
        Self {
            healthy,
            weight,
            status_line,
        }
    }

    pub fn healthy(&self) -> bool {
        self.healthy
    }

    pub fn weight(&self) -> u8 {
        self.weight
    }

    /// Agent-check line without the trailing newline.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }
}

impl Default for HealthVerdict {
    fn default() -> Self {
        Self::down()
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_line)
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Everything one sampling cycle learned, published as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub verdict: HealthVerdict,
    /// Height reported by the monitored node (0 if unknown or failed).
    pub local_height: i64,
    /// Highest height among reference nodes that answered (0 if none did).
    pub highest_reference_height: i64,
    /// When the cycle finished; `None` before the first sample.
    pub sampled_at: Option<SystemTime>,
}

impl HealthSnapshot {
    /// Snapshot for a cycle that produced only a verdict (metric source).
    pub fn from_verdict(verdict: HealthVerdict) -> Self {
        Self {
            verdict,
            local_height: 0,
            highest_reference_height: 0,
            sampled_at: Some(SystemTime::now()),
        }
    }

    /// Snapshot for a chain-height cycle.
    pub fn with_heights(
        verdict: HealthVerdict,
        local_height: i64,
        highest_reference_height: i64,
    ) -> Self {
        Self {
            verdict,
            local_height,
            highest_reference_height,
            sampled_at: Some(SystemTime::now()),
        }
    }
}
