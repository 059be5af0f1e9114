//! Outbound HTTP client shared by every health source.
//!
//! Wraps a pooled hyper client and bounds each request (connect, headers
//! and body) with a single timeout.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::trace;

use crate::error::{FetchError, FetchResult};

const AGENT: &str = concat!("nodeweight/", env!("CARGO_PKG_VERSION"));

/// Default bound on a single outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Cheap-to-clone HTTP client with a per-request timeout.
#[derive(Clone)]
pub struct NodeClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NodeClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        connector.set_nodelay(true);
        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON body and return the raw response body.
    ///
    /// Any status other than `200 OK` is a [`FetchError::Status`].
    pub async fn post_json(&self, url: &str, body: Vec<u8>) -> FetchResult<Bytes> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(parse_uri(url)?)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, AGENT)
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| invalid_url(url, e))?;
        self.send(url, req).await
    }

    /// GET `url` and return the raw response body.
    pub async fn get(&self, url: &str) -> FetchResult<Bytes> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(parse_uri(url)?)
            .header(USER_AGENT, AGENT)
            .body(Full::new(Bytes::new()))
            .map_err(|e| invalid_url(url, e))?;
        self.send(url, req).await
    }

    async fn send(&self, url: &str, req: Request<Full<Bytes>>) -> FetchResult<Bytes> {
        let exchange = async {
            let resp = self
                .inner
                .request(req)
                .await
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            let status = resp.status();
            if status != StatusCode::OK {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| FetchError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
                .to_bytes();
            trace!(%url, bytes = body.len(), "response received");
            Ok::<_, FetchError>(body)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

impl Default for NodeClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

fn parse_uri(url: &str) -> FetchResult<Uri> {
    let uri: Uri = url.parse().map_err(|e| invalid_url(url, e))?;
    if uri.scheme_str() != Some("http") {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "only http:// endpoints are supported".to_string(),
        });
    }
    if uri.host().is_none() {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(uri)
}

fn invalid_url(url: &str, e: impl fmt::Display) -> FetchError {
    FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

/// Check that `url` is something [`NodeClient`] can reach.
pub fn validate_url(url: &str) -> FetchResult<()> {
    parse_uri(url).map(|_| ())
}
