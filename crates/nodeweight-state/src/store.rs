//! SharedHealth — the single-writer, many-reader health cell.
//!
//! Holds an `Arc<HealthSnapshot>` behind a `tokio::sync::RwLock`. The write
//! guard is held only long enough to swap the pointer, the read guard only
//! long enough to clone it, so neither side ever waits on network I/O.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use crate::types::{HealthSnapshot, HealthVerdict};

/// Cloneable handle to the current health snapshot.
#[derive(Clone, Debug, Default)]
pub struct SharedHealth {
    current: Arc<RwLock<Arc<HealthSnapshot>>>,
}

impl SharedHealth {
    /// Create a cell holding the default "down" snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell holding `initial`.
    pub fn with_snapshot(initial: HealthSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Replace the current snapshot wholesale.
    pub async fn publish(&self, snapshot: HealthSnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().await;
        *guard = next;
        trace!(status = %guard.verdict, "health snapshot published");
    }

    /// The most recently published snapshot.
    pub async fn snapshot(&self) -> Arc<HealthSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// The most recently published verdict.
    pub async fn verdict(&self) -> HealthVerdict {
        self.snapshot().await.verdict.clone()
    }

    /// Agent-check status line of the current verdict, without newline.
    pub async fn status_line(&self) -> String {
        self.snapshot().await.verdict.status_line().to_string()
    }
}
