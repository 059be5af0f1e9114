//! Metric extraction and threshold policies.
//!
//! A metrics payload is plain text in the Prometheus exposition style. The
//! first line that starts with the metric name followed by whitespace and a
//! value wins; the value must be an integer.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use nodeweight_state::{HealthVerdict, WEIGHT_DEGRADED, WEIGHT_FULL};

use crate::error::ParseError;

/// Metric read when none is configured.
pub const DEFAULT_METRIC: &str = "sync_execution_network_diff";

/// Largest value accepted by the default bounded-range threshold.
pub const DEFAULT_THRESHOLD_MAX: i64 = 2;

/// Compiled search pattern for one named metric.
#[derive(Debug, Clone)]
pub struct MetricPattern {
    name: String,
    regex: Regex,
}

impl MetricPattern {
    /// Build a pattern for `name`. The name is matched literally.
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"(?m)^{}[ \t]+(\S+)", regex::escape(name)))?;
        Ok(Self {
            name: name.to_string(),
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the metric in `body` and parse its value.
    pub fn extract(&self, body: &str) -> Result<i64, ParseError> {
        let caps = self
            .regex
            .captures(body)
            .ok_or_else(|| ParseError::MetricNotFound(self.name.clone()))?;
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        raw.parse::<i64>().map_err(|_| ParseError::MetricValue {
            metric: self.name.clone(),
            value: raw.to_string(),
        })
    }
}

// ── Threshold ─────────────────────────────────────────────────────

/// How a metric value maps to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// `0` is fully healthy; anything else keeps a reduced weight but is
    /// reported unhealthy.
    #[default]
    EqualsZero,
    /// Values up to and including the bound are healthy; above it the node
    /// is down.
    AtMost(i64),
}

impl Threshold {
    /// Verdict for a successfully parsed metric value.
    pub fn evaluate(&self, value: i64) -> HealthVerdict {
        match *self {
            Threshold::EqualsZero if value == 0 => HealthVerdict::up(WEIGHT_FULL),
            Threshold::EqualsZero => HealthVerdict::degraded(WEIGHT_DEGRADED),
            Threshold::AtMost(max) if value <= max => HealthVerdict::up(WEIGHT_FULL),
            Threshold::AtMost(_) => HealthVerdict::down(),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::EqualsZero => f.write_str("== 0"),
            Threshold::AtMost(max) => write!(f, "<= {max}"),
        }
    }
}

/// Threshold style names as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    Zero,
    AtMost,
}

impl ThresholdKind {
    /// Combine with the configured bound into a policy.
    pub fn with_max(self, max: i64) -> Threshold {
        match self {
            ThresholdKind::Zero => Threshold::EqualsZero,
            ThresholdKind::AtMost => Threshold::AtMost(max),
        }
    }
}

impl FromStr for ThresholdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "equals-zero" | "eq0" => Ok(ThresholdKind::Zero),
            "at-most" | "range" | "max" => Ok(ThresholdKind::AtMost),
            other => Err(format!("unknown threshold '{other}' (expected zero|at-most)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_pattern() -> MetricPattern {
        MetricPattern::new(DEFAULT_METRIC).unwrap()
    }

    const BODY: &str = "\
# HELP sync_execution_network_diff Blocks behind the network head.
# TYPE sync_execution_network_diff gauge
sync_execution_network_diff 7
sync_execution_network_diff_total 0
";

    #[test]
    fn extracts_first_match() {
        let pattern = default_pattern();
        assert_eq!(pattern.extract(BODY).unwrap(), 7);
        assert_eq!(
            pattern
                .extract("sync_execution_network_diff 0\nsync_execution_network_diff 9\n")
                .unwrap(),
            0
        );
    }

    #[test]
    fn comment_lines_do_not_match() {
        let pattern = default_pattern();
        let body = "# HELP sync_execution_network_diff 3\n";
        assert!(matches!(pattern.extract(body), Err(ParseError::MetricNotFound(_))));
    }

    #[test]
    fn longer_names_do_not_match() {
        let pattern = default_pattern();
        let body = "sync_execution_network_diff_total 0\n";
        assert!(matches!(pattern.extract(body), Err(ParseError::MetricNotFound(_))));
    }

    #[test]
    fn non_integer_value_is_rejected() {
        let pattern = default_pattern();
        match pattern.extract("sync_execution_network_diff 1.5\n") {
            Err(ParseError::MetricValue { value, .. }) => assert_eq!(value, "1.5"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn custom_name_is_escaped() {
        let pattern = MetricPattern::new("lag.blocks").unwrap();
        assert_eq!(pattern.extract("lag.blocks 4\n").unwrap(), 4);
        assert!(pattern.extract("lagXblocks 4\n").is_err());
    }

    #[test]
    fn equals_zero_policy() {
        let up = Threshold::EqualsZero.evaluate(0);
        assert!(up.healthy());
        assert_eq!(up.weight(), 100);

        let behind = Threshold::EqualsZero.evaluate(7);
        assert!(!behind.healthy());
        assert_eq!(behind.weight(), 50);
    }

    #[test]
    fn at_most_policy() {
        let policy = Threshold::AtMost(DEFAULT_THRESHOLD_MAX);
        assert!(policy.evaluate(0).healthy());
        assert!(policy.evaluate(2).healthy());
        assert!(policy.evaluate(-1).healthy());

        let behind = policy.evaluate(7);
        assert!(!behind.healthy());
        assert_eq!(behind.weight(), 0);
    }

    #[test]
    fn threshold_kind_parses() {
        assert_eq!("zero".parse::<ThresholdKind>().unwrap(), ThresholdKind::Zero);
        assert_eq!("At-Most".parse::<ThresholdKind>().unwrap(), ThresholdKind::AtMost);
        assert!("sometimes".parse::<ThresholdKind>().is_err());
        assert_eq!(ThresholdKind::AtMost.with_max(5), Threshold::AtMost(5));
        assert_eq!(ThresholdKind::Zero.with_max(5), Threshold::EqualsZero);
    }
}
