//! Engine error definitions.

use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The data directory could not be prepared.
    #[error("failed to prepare data directory {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The message could not be handed to the engine at all.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The engine ended the session. `reply` is sent before the connection closes.
    #[error("session closed by engine")]
    SessionClosed { reply: Bytes },
}
