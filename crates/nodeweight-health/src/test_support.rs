//! In-process mock nodes for tests.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port.
pub(crate) async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A JSON-RPC node that answers every call with `result`.
pub(crate) async fn spawn_rpc_node(result: &'static str) -> String {
    let router = Router::new().route(
        "/",
        post(move || async move {
            axum::Json(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": result}))
        }),
    );
    format!("http://{}", spawn_server(router).await)
}

/// A metrics endpoint serving `body` at `/metrics`.
pub(crate) async fn spawn_metrics_endpoint(body: &'static str) -> String {
    let router = Router::new().route("/metrics", get(move || async move { body }));
    format!("http://{}/metrics", spawn_server(router).await)
}
