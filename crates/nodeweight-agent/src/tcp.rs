//! HAProxy agent-check server.
//!
//! Every accepted connection gets exactly one line, the current status
//! (`up weight=100`, `down`, ...) followed by `\n`, and is then closed.
//! Nothing is read from the client.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use nodeweight_state::SharedHealth;

/// Default agent-check port.
pub const DEFAULT_AGENT_PORT: u16 = 9876;

/// Bound on writing the status line to a single client.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP listener that answers agent-check probes from shared health state.
///
/// Probes only read state; sampling happens elsewhere.
pub struct AgentServer {
    listener: TcpListener,
    health: SharedHealth,
    write_timeout: Duration,
}

impl AgentServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr, health: SharedHealth) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            health,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }

    /// Override the per-connection write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` flips to `true` or its sender is
    /// dropped.
    ///
    /// Each connection is handled on its own task; the loop goes straight
    /// back to accepting. Accept failures are logged and skipped.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!(%addr, "agent-check server listening"),
            Err(e) => warn!(error = %e, "agent-check server listening on unknown address"),
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let health = self.health.clone();
                        let timeout = self.write_timeout;
                        tokio::spawn(async move {
                            answer_probe(stream, peer, health, timeout).await;
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "agent-check accept failed");
                    }
                },
                _ = shutdown.changed() => {
                    debug!("agent-check server received shutdown");
                    break;
                }
            }
        }

        info!("agent-check server stopped");
    }
}

/// Write the current status line to one probe connection, then close it.
async fn answer_probe(
    mut stream: TcpStream,
    peer: SocketAddr,
    health: SharedHealth,
    timeout: Duration,
) {
    let status = health.status_line().await;
    let mut line = Vec::with_capacity(status.len() + 1);
    line.extend_from_slice(status.as_bytes());
    line.push(b'\n');

    let write = async {
        stream.write_all(&line).await?;
        stream.shutdown().await?;
        Ok::<_, io::Error>(())
    };

    match tokio::time::timeout(timeout, write).await {
        Ok(Ok(())) => debug!(%peer, %status, "agent status sent"),
        Ok(Err(e)) => warn!(%peer, error = %e, "agent status write failed"),
        Err(_) => warn!(
            %peer,
            timeout_ms = timeout.as_millis() as u64,
            "agent status write timed out"
        ),
    }
}
