//! Engine boundary.
//!
//! # Data Flow
//! ```text
//! session handler
//!     → Engine::execute_raw (one framed protocol message in, raw reply out)
//!
//! call mode:
//!     → guard.rs (answers the negotiation request itself)
//!     → embedded.rs
//!
//! startup:
//!     embedded.rs initialize() → ready.rs resolve() → waiting connections proceed
//! ```
//!
//! # Design Decisions
//! - The engine is addressed only through raw protocol bytes
//! - Readiness is a write-once signal, never a mutable flag
//! - Decorators implement `Engine` themselves so they compose freely

pub mod embedded;
pub mod error;
pub mod guard;
pub mod ready;

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;

pub use embedded::EmbeddedEngine;
pub use error::EngineError;
pub use guard::NegotiationGuard;
pub use ready::ReadySignal;

/// A SQL engine that executes raw wire-protocol messages.
pub trait Engine: Send + Sync + 'static {
    /// Signal resolved once the engine has finished initialization.
    fn ready(&self) -> &ReadySignal;

    /// Execute one complete protocol message and return the raw reply.
    ///
    /// An empty reply means the message produces no output.
    fn execute_raw(&self, message: Bytes) -> impl Future<Output = Result<Bytes, EngineError>> + Send;
}

impl<E: Engine> Engine for Arc<E> {
    fn ready(&self) -> &ReadySignal {
        (**self).ready()
    }

    fn execute_raw(&self, message: Bytes) -> impl Future<Output = Result<Bytes, EngineError>> + Send {
        (**self).execute_raw(message)
    }
}
