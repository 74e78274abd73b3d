//! Call-level negotiation interceptor.
//!
//! Wraps an engine's `execute_raw` so that the encryption-negotiation request
//! is declined without reaching the engine, whatever transport framed it.
//!
//! The guard sees messages, not connections, so it has no first frame to
//! classify. Only declines are counted in `pgsocket_preamble_frames_total`;
//! the `passthrough` series is fed by socket mode alone.

use bytes::Bytes;

use crate::engine::{Engine, EngineError, ReadySignal};
use crate::observability::metrics;
use crate::preamble::matcher::{self, DECLINE_RESPONSE};

/// Engine decorator that answers the negotiation request itself.
#[derive(Debug)]
pub struct NegotiationGuard<E> {
    inner: E,
}

impl<E> NegotiationGuard<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    /// The wrapped engine.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Engine> Engine for NegotiationGuard<E> {
    fn ready(&self) -> &ReadySignal {
        self.inner.ready()
    }

    async fn execute_raw(&self, message: Bytes) -> Result<Bytes, EngineError> {
        let kind = matcher::classify(&message);
        if kind == matcher::FrameKind::NegotiationRequest {
            tracing::debug!("Declining encryption negotiation");
            metrics::record_preamble_frame(kind);
            return Ok(Bytes::from_static(&[DECLINE_RESPONSE]));
        }
        self.inner.execute_raw(message).await
    }
}
