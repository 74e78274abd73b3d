//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (id, lifecycle logging, drain accounting)
//!     → server.rs (per-connection task)
//!     → preamble shim or session handler
//!     → stream.rs (PrefixedStream replays bytes the shim read ahead)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - No TLS: encryption requests are always declined

pub mod connection;
pub mod listener;
pub mod server;
pub mod stream;

pub use server::{Frontend, Server};
