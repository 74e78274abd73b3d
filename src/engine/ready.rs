//! Engine readiness signal.
//!
//! # Design Decisions
//! - Backed by a `watch` channel holding `false` until resolved
//! - Resolution happens once; repeated calls are no-ops
//! - Every waiter subscribes independently, so there is no ordering between them

use std::sync::Arc;
use tokio::sync::watch;

/// Write-once, read-many completion marking that the engine can serve messages.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    /// Create an unresolved signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Create a signal that is already resolved.
    pub fn resolved() -> Self {
        let signal = Self::new();
        signal.resolve();
        signal
    }

    /// Mark the engine ready. Returns true only for the call that resolved it.
    pub fn resolve(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Check readiness without waiting.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is resolved. Returns immediately afterwards.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}
