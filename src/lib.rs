//! PostgreSQL wire-protocol front-end for an embedded SQL engine.
//!
//! The interesting part is the connection preamble: a client may open with an
//! 8-byte encryption request, which is declined with a single `N` before the
//! session handler ever sees the stream. Two front-ends do this:
//! [`preamble`] inspects the socket itself, [`engine::NegotiationGuard`]
//! intercepts the request at the engine's raw-message entry point.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod preamble;
pub mod protocol;
pub mod session;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
