//! `eth_blockNumber` over JSON-RPC.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::NodeClient;
use crate::error::{FetchResult, ParseError};

const BLOCK_NUMBER_METHOD: &str = "eth_blockNumber";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: [(); 0],
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Serialized `eth_blockNumber` request body.
pub fn block_number_request() -> Vec<u8> {
    let req = JsonRpcRequest {
        jsonrpc: "2.0",
        method: BLOCK_NUMBER_METHOD,
        params: [],
        id: 1,
    };
    // A fixed struct of strings and integers always serializes.
    serde_json::to_vec(&req).unwrap_or_default()
}

/// Render a non-negative height the way nodes report it (`0x`-prefixed hex).
pub fn block_number_to_hex(height: i64) -> String {
    format!("0x{height:x}")
}

/// Parse a `0x`-prefixed hex quantity into a height.
pub fn parse_block_number(value: &str) -> Result<i64, ParseError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ParseError::MissingHexPrefix(value.to_string()))?;

    // from_str_radix tolerates a leading sign; node quantities never carry one.
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::HexDigits(value.to_string()));
    }

    i64::from_str_radix(digits, 16).map_err(|source| ParseError::Hex {
        value: value.to_string(),
        source,
    })
}

/// Extract the height from a raw `eth_blockNumber` response body.
pub fn parse_block_number_response(body: &[u8]) -> Result<i64, ParseError> {
    let resp: JsonRpcResponse = serde_json::from_slice(body)?;
    if let Some(err) = resp.error {
        return Err(ParseError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let result = resp.result.ok_or(ParseError::MissingResult)?;
    parse_block_number(&result)
}

/// Ask the node at `url` for its current block height.
pub async fn fetch_block_number(client: &NodeClient, url: &str) -> FetchResult<i64> {
    let body = client.post_json(url, block_number_request()).await?;
    let height = parse_block_number_response(&body)?;
    debug!(%url, height, "fetched block number");
    Ok(height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::test_support::{spawn_rpc_node, spawn_server};
    use axum::Router;
    use axum::routing::post;

    #[test]
    fn request_body_is_exact() {
        let body: serde_json::Value = serde_json::from_slice(&block_number_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "eth_blockNumber",
                "params": [],
                "id": 1
            })
        );
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_block_number("0x0").unwrap(), 0);
        assert_eq!(parse_block_number("0x64").unwrap(), 100);
        assert_eq!(parse_block_number("0x32").unwrap(), 50);
        assert_eq!(parse_block_number("0X1bc4F2").unwrap(), 0x1bc4f2);
    }

    #[test]
    fn hex_round_trip() {
        for n in [0i64, 1, 15, 16, 255, 19_000_000, 1 << 40, i64::MAX - 1, i64::MAX] {
            assert_eq!(parse_block_number(&block_number_to_hex(n)).unwrap(), n, "n = {n}");
        }
    }

    #[test]
    fn rejects_malformed_quantities() {
        assert!(matches!(
            parse_block_number("64"),
            Err(ParseError::MissingHexPrefix(_))
        ));
        assert!(matches!(parse_block_number("0x"), Err(ParseError::Hex { .. })));
        assert!(matches!(parse_block_number("0xzz"), Err(ParseError::HexDigits(_))));
        assert!(matches!(parse_block_number("0x-5"), Err(ParseError::HexDigits(_))));
        assert!(matches!(parse_block_number("0x+5"), Err(ParseError::HexDigits(_))));
        // One past i64::MAX.
        assert!(matches!(
            parse_block_number("0x8000000000000000"),
            Err(ParseError::Hex { .. })
        ));
    }

    #[test]
    fn parses_response_body() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":"0x64"}"#;
        assert_eq!(parse_block_number_response(body).unwrap(), 100);
    }

    #[test]
    fn rpc_error_object_is_reported() {
        let body = br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        match parse_block_number_response(body) {
            Err(ParseError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_result_and_bad_json() {
        assert!(matches!(
            parse_block_number_response(br#"{"jsonrpc":"2.0","id":1}"#),
            Err(ParseError::MissingResult)
        ));
        assert!(matches!(
            parse_block_number_response(b"<html>"),
            Err(ParseError::Json(_))
        ));
    }

    #[tokio::test]
    async fn fetches_from_node() {
        let url = spawn_rpc_node("0x64").await;
        let height = fetch_block_number(&NodeClient::default(), &url).await.unwrap();
        assert_eq!(height, 100);
    }

    #[tokio::test]
    async fn node_receives_block_number_call() {
        let router = Router::new().route(
            "/",
            post(|axum::Json(req): axum::Json<serde_json::Value>| async move {
                let height = if req["method"] == "eth_blockNumber" { "0x1" } else { "0x0" };
                axum::Json(serde_json::json!({"jsonrpc":"2.0","id":1,"result":height}))
            }),
        );
        let addr = spawn_server(router).await;
        let height = fetch_block_number(&NodeClient::default(), &format!("http://{addr}"))
            .await
            .unwrap();
        assert_eq!(height, 1);
    }

    #[tokio::test]
    async fn malformed_result_surfaces_as_parse_error() {
        let url = spawn_rpc_node("latest").await;
        let err = fetch_block_number(&NodeClient::default(), &url).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(ParseError::MissingHexPrefix(_))));
    }
}
