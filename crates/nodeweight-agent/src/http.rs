//! HTTP status-code endpoint (pull model).
//!
//! `GET /rpc-health` samples the source once per request and answers with
//! a bare status code: 200 when the verdict is healthy, 500 otherwise.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use nodeweight_health::HealthSource;

/// Default port for the HTTP status endpoint.
pub const DEFAULT_APP_PORT: u16 = 8282;

/// Route served by [`status_router`].
pub const HEALTH_ROUTE: &str = "/rpc-health";

/// Build the router exposing [`HEALTH_ROUTE`] for `source`.
pub fn status_router<S: HealthSource>(source: Arc<S>) -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(rpc_health::<S>))
        .with_state(source)
}

/// GET /rpc-health
async fn rpc_health<S: HealthSource>(State(source): State<Arc<S>>) -> StatusCode {
    let sample = source.sample().await;
    let code = if sample.verdict.healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    debug!(
        source = source.name(),
        status = %sample.verdict,
        code = code.as_u16(),
        "health probe answered"
    );
    code
}

/// Serve `router` on `listener` until `shutdown` flips or its sender drops.
pub async fn serve_status(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, route = HEALTH_ROUTE, "status endpoint listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            info!("status endpoint shutting down");
        })
        .await
}
