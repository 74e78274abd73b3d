//! Per-connection preamble shim and handoff controller.
//!
//! # Responsibilities
//! - Accumulate the first 8 bytes of a connection
//! - Decline an encryption-negotiation request inline
//! - Push unclassified bytes back in front of the stream
//! - Wait for engine readiness, then attach the session handler
//!
//! # Design Decisions
//! - The shim never reads again after classification
//! - Handler failures are contained here; the listener never sees them
//! - An incomplete preamble waits forever unless a timeout is configured

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::engine::ReadySignal;
use crate::net::connection::ConnectionId;
use crate::net::stream::{ByteStream, PrefixedStream};
use crate::observability::metrics;
use crate::preamble::accumulator::PreambleBuffer;
use crate::preamble::matcher::{self, FrameKind, DECLINE_RESPONSE};
use crate::preamble::state::PreambleState;
use crate::session::{SessionError, SessionHandler};

/// Errors that end a connection before it reaches the session handler.
#[derive(Debug, Error)]
pub enum PreambleError {
    /// The client did not send a full frame in time.
    #[error("preamble not received within {0:?}")]
    Timeout(Duration),

    /// Reading the preamble or writing the decline byte failed.
    #[error("I/O error during preamble: {0}")]
    Io(#[from] std::io::Error),
}

/// How a connection left the shim.
#[derive(Debug)]
pub enum Handoff {
    /// The session handler ran to completion.
    Completed(FrameKind),
    /// The peer closed before sending a full frame.
    PeerClosed,
    /// The session handler failed; the connection has been closed.
    Rejected(SessionError),
}

/// Connection-preamble negotiation shim in front of a session handler.
#[derive(Debug)]
pub struct Preamble<H> {
    handler: Arc<H>,
    ready: ReadySignal,
    timeout: Option<Duration>,
}

impl<H: SessionHandler> Preamble<H> {
    /// Create a shim that attaches connections to `handler` once `ready` resolves.
    pub fn new(handler: Arc<H>, ready: ReadySignal) -> Self {
        Self {
            handler,
            ready,
            timeout: None,
        }
    }

    /// Bound the time a client may take to send its first frame.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the preamble of `stream` and hand it to the session handler.
    pub async fn run<S: ByteStream>(&self, mut stream: S, id: ConnectionId) -> Result<Handoff, PreambleError> {
        let mut state = PreambleState::Accepted;
        advance(&mut state, PreambleState::Accumulating, id);

        let mut buffer = PreambleBuffer::new();
        let accumulated = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, buffer.accumulate(&mut stream)).await {
                Ok(result) => result,
                Err(_) => {
                    advance(&mut state, PreambleState::Closed, id);
                    metrics::record_preamble_aborted("timeout");
                    let _ = stream.shutdown().await;
                    return Err(PreambleError::Timeout(limit));
                }
            },
            None => buffer.accumulate(&mut stream).await,
        };

        let frame = match accumulated {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                advance(&mut state, PreambleState::Closed, id);
                tracing::debug!(
                    connection_id = %id,
                    buffered = buffer.len(),
                    "Peer closed before preamble completed"
                );
                metrics::record_preamble_aborted("disconnect");
                return Ok(Handoff::PeerClosed);
            }
            Err(e) => {
                advance(&mut state, PreambleState::Closed, id);
                metrics::record_preamble_aborted("io");
                return Err(e.into());
            }
        };

        let kind = matcher::classify(&frame);
        advance(&mut state, PreambleState::Classified(kind), id);
        metrics::record_preamble_frame(kind);

        if kind == FrameKind::NegotiationRequest {
            tracing::debug!(connection_id = %id, "Declining encryption negotiation");
            stream.write_all(&[DECLINE_RESPONSE]).await?;
            stream.flush().await?;
            buffer.consume_frame();
        }

        let stream = PrefixedStream::new(buffer.into_remainder(), stream);

        advance(&mut state, PreambleState::AwaitingEngineReady, id);
        if !self.ready.is_ready() {
            tracing::debug!(connection_id = %id, "Waiting for engine readiness");
        }
        self.ready.wait().await;

        advance(&mut state, PreambleState::Attached, id);
        let outcome = match self.handler.attach(stream).await {
            Ok(()) => Handoff::Completed(kind),
            Err(e) => {
                // The handler owned the stream; it is closed by now.
                tracing::error!(connection_id = %id, error = %e, "Session handler failed");
                metrics::record_handoff_failure();
                Handoff::Rejected(e)
            }
        };
        advance(&mut state, PreambleState::Closed, id);
        Ok(outcome)
    }
}

fn advance(state: &mut PreambleState, next: PreambleState, id: ConnectionId) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    tracing::trace!(connection_id = %id, from = %state, to = %next, "Preamble state");
    *state = next;
}
