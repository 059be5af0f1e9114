//! Error types for health sampling.
//!
//! None of these escape a [`HealthSource`](crate::HealthSource): sources turn
//! them into verdicts. They exist so fetch and parse helpers can use `?` and
//! so log lines carry a precise cause.

use std::num::ParseIntError;

use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure reaching a node or metrics endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("reading response body from {url} failed: {reason}")]
    Body { url: String, reason: String },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A response arrived but its content was unusable.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON-RPC response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON-RPC response has no result")]
    MissingResult,

    #[error("block number '{0}' is missing the 0x prefix")]
    MissingHexPrefix(String),

    #[error("block number '{0}' contains non-hex characters")]
    HexDigits(String),

    #[error("block number '{value}' is not a 64-bit hex integer: {source}")]
    Hex {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("metric '{0}' not found in response")]
    MetricNotFound(String),

    #[error("metric '{metric}' has non-integer value '{value}'")]
    MetricValue { metric: String, value: String },

    #[error("metrics body is not valid UTF-8")]
    Utf8,
}
