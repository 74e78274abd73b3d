//! Per-connection preamble state machine.
//!
//! # State Transitions
//! ```text
//! Accepted → Accumulating → Classified → AwaitingEngineReady → Attached → Closed
//! any state → Closed
//! ```
//!
//! No transition re-enters `Accumulating` once a frame has been classified.

use crate::preamble::matcher::FrameKind;

/// Where a connection is in the preamble lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleState {
    Accepted,
    Accumulating,
    Classified(FrameKind),
    AwaitingEngineReady,
    Attached,
    Closed,
}

impl PreambleState {
    /// Whether `next` is reachable from `self` in one step.
    pub fn can_transition_to(&self, next: PreambleState) -> bool {
        use PreambleState::*;
        matches!(
            (self, next),
            (Accepted, Accumulating)
                | (Accumulating, Classified(_))
                | (Classified(_), AwaitingEngineReady)
                | (AwaitingEngineReady, Attached)
                | (Accepted | Accumulating | Classified(_) | AwaitingEngineReady | Attached, Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == PreambleState::Closed
    }
}

impl std::fmt::Display for PreambleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreambleState::Accepted => write!(f, "accepted"),
            PreambleState::Accumulating => write!(f, "accumulating"),
            PreambleState::Classified(kind) => write!(f, "classified({})", kind),
            PreambleState::AwaitingEngineReady => write!(f, "awaiting_engine_ready"),
            PreambleState::Attached => write!(f, "attached"),
            PreambleState::Closed => write!(f, "closed"),
        }
    }
}
