//! Accept loop wiring the listener to a front-end.
//!
//! # Responsibilities
//! - Spawn one task per accepted connection, inside its own span
//! - Route the connection through the preamble shim (socket mode) or straight
//!   to the session handler (call mode)
//! - Stop accepting on shutdown and drain open connections
//!
//! # Design Decisions
//! - Accept errors are logged and retried; they never end the loop
//! - Per-connection failures are logged inside the connection task

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::{metrics, tracing::connection_span};
use crate::preamble::{Handoff, Preamble};
use crate::session::SessionHandler;

/// Delay before accepting again after an accept error (e.g. EMFILE).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How accepted connections reach the session handler.
pub enum Frontend<H> {
    /// Preamble shim in front of the handler.
    Socket(Arc<Preamble<H>>),
    /// Handler directly; its engine is expected to guard the negotiation request.
    Call(Arc<H>),
}

impl<H> Clone for Frontend<H> {
    fn clone(&self) -> Self {
        match self {
            Frontend::Socket(preamble) => Frontend::Socket(Arc::clone(preamble)),
            Frontend::Call(handler) => Frontend::Call(Arc::clone(handler)),
        }
    }
}

impl<H> Frontend<H> {
    fn name(&self) -> &'static str {
        match self {
            Frontend::Socket(_) => "socket",
            Frontend::Call(_) => "call",
        }
    }
}

/// TCP server for the wire protocol.
pub struct Server<H> {
    listener: Listener,
    frontend: Frontend<H>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl<H: SessionHandler> Server<H> {
    pub fn new(listener: Listener, frontend: Frontend<H>) -> Self {
        Self {
            listener,
            frontend,
            tracker: ConnectionTracker::new(),
            drain_timeout: Duration::from_secs(10),
        }
    }

    /// How long shutdown waits for open connections.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let address = self.listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %address,
            mode = self.frontend.name(),
            max_connections = self.listener.max_connections(),
            "Listening"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let guard = self.tracker.track(peer_addr);
                        let span = connection_span(guard.id(), peer_addr);
                        let frontend = self.frontend.clone();
                        tokio::spawn(
                            async move {
                                serve_connection(frontend, stream, guard).await;
                                drop(permit);
                            }
                            .instrument(span),
                        );
                    }
                    Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        self.drain().await;
        Ok(())
    }

    async fn drain(&self) {
        let open = self.tracker.active_count();
        if open == 0 {
            return;
        }

        tracing::info!(open_connections = open, timeout = ?self.drain_timeout, "Draining connections");
        if tokio::time::timeout(self.drain_timeout, self.tracker.wait_for_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                open_connections = self.tracker.active_count(),
                "Drain timeout elapsed, abandoning open connections"
            );
        }
    }
}

async fn serve_connection<H: SessionHandler>(frontend: Frontend<H>, stream: TcpStream, guard: ConnectionGuard) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    match frontend {
        Frontend::Socket(preamble) => match preamble.run(stream, guard.id()).await {
            Ok(Handoff::Completed(kind)) => tracing::debug!(frame = %kind, "Session detached"),
            Ok(Handoff::PeerClosed) | Ok(Handoff::Rejected(_)) => {}
            Err(e) => tracing::warn!(error = %e, "Preamble aborted"),
        },
        Frontend::Call(handler) => {
            if let Err(e) = handler.attach(stream).await {
                tracing::error!(error = %e, "Session handler failed");
                metrics::record_handoff_failure();
            }
        }
    }

    drop(guard);
}
