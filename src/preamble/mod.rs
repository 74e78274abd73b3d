//! Connection-preamble negotiation shim (socket mode).
//!
//! # Data Flow
//! ```text
//! accepted stream
//!     → accumulator.rs (buffer until 8 bytes)
//!     → matcher.rs (negotiation request? answer 'N')
//!     → handoff.rs (replay remainder, await engine readiness, attach handler)
//!
//! Connection states (state.rs):
//!     Accepted → Accumulating → Classified → AwaitingEngineReady → Attached → Closed
//! ```
//!
//! # Design Decisions
//! - Only the exact 8-byte SSLRequest is answered; everything else passes through
//! - Encryption is always declined, never negotiated
//! - Unread bytes are replayed through `PrefixedStream`, never dropped

pub mod accumulator;
pub mod handoff;
pub mod matcher;
pub mod state;

pub use accumulator::{Accumulated, PreambleBuffer};
pub use handoff::{Handoff, Preamble, PreambleError};
pub use matcher::{is_negotiation_request, FrameKind, DECLINE_RESPONSE, NEGOTIATION_REQUEST};
pub use state::PreambleState;
