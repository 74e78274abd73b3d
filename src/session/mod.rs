//! Session handler boundary.
//!
//! # Data Flow
//! ```text
//! stream (preamble already resolved)
//!     → framing.rs (split into discrete protocol messages)
//!     → Engine::execute_raw per message
//!     → replies written back until Terminate or EOF
//! ```

pub mod error;
pub mod framing;
pub mod raw;

use std::future::Future;

use crate::net::stream::ByteStream;

pub use error::SessionError;
pub use framing::MessageCodec;
pub use raw::RawSession;

/// Drives the wire protocol for a connection it has taken ownership of.
pub trait SessionHandler: Send + Sync + 'static {
    /// Run the session to completion. The stream is closed when this returns.
    fn attach<S: ByteStream>(&self, stream: S) -> impl Future<Output = Result<(), SessionError>> + Send;
}
