//! nodeweight-health — health sources and the sampler loop.
//!
//! Turns a blockchain node (or its metrics endpoint) into a
//! [`HealthVerdict`](nodeweight_state::HealthVerdict) and keeps
//! [`SharedHealth`](nodeweight_state::SharedHealth) current.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor (background task)
//!   ├── HealthSource::sample()
//!   │   ├── ChainHeightSource → eth_blockNumber on local + reference nodes
//!   │   └── MetricSource      → GET /metrics, regex, Threshold
//!   ├── SharedHealth::publish()
//!   └── sleep(interval), then again
//! ```
//!
//! Sources never fail outward. A node that cannot be reached, or answers
//! with something unparseable, yields a "down" verdict (local node, metric)
//! or is left out of the comparison (reference node).

pub mod client;
pub mod error;
pub mod metric;
pub mod monitor;
pub mod rpc;
pub mod source;

#[cfg(test)]
mod test_support;

pub use client::NodeClient;
pub use error::{FetchError, FetchResult, ParseError};
pub use metric::{MetricPattern, Threshold, ThresholdKind};
pub use monitor::HealthMonitor;
pub use rpc::{block_number_to_hex, fetch_block_number, parse_block_number};
pub use source::{ChainHeightSource, HealthSource, MetricSource, Sample};
