//! PostgreSQL wire-protocol fragments.
//!
//! Only what the preamble shim and the stand-in engine need: startup-phase
//! request decoding and a handful of backend messages.

pub mod backend;
pub mod error;
pub mod frontend;

pub use backend::{BackendMessage, ErrorField, TransactionStatus};
pub use error::ProtocolError;
pub use frontend::{StartupParameters, StartupRequest};
