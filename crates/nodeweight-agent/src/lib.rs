//! nodeweight-agent — probe servers for the load balancer.
//!
//! Two transports, one per deployment:
//!
//! | Mode | Transport | Reads |
//! |---|---|---|
//! | push | TCP agent-check (`AgentServer`) | [`SharedHealth`](nodeweight_state::SharedHealth), kept fresh by the sampler |
//! | pull | HTTP `GET /rpc-health` (`status_router`) | one fresh sample per request |
//!
//! The agent-check wire format is a single line matching
//! `^(up|down)( weight=\d{1,3})?\n$`, after which the connection is closed.

pub mod http;
pub mod tcp;

pub use http::{DEFAULT_APP_PORT, HEALTH_ROUTE, serve_status, status_router};
pub use tcp::{AgentServer, DEFAULT_AGENT_PORT};
