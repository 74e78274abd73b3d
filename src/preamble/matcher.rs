//! Encryption-negotiation request recognition.
//!
//! # Wire Format
//! ```text
//! 00 00 00 08 | 04 D2 16 2F
//! length = 8  | request code 1234.5679
//! ```
//!
//! # Design Decisions
//! - Exact byte comparison; no prefix or fuzzy matching
//! - A real startup packet is always longer than 8 bytes, so it never matches

/// Size of the classification frame.
pub const FRAME_LEN: usize = 8;

/// The encryption-negotiation request (`SSLRequest`).
pub const NEGOTIATION_REQUEST: [u8; FRAME_LEN] = [0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x2f];

/// Single-byte answer declining encryption.
pub const DECLINE_RESPONSE: u8 = b'N';

/// Classification of the first frame of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The client asked for an encrypted session.
    NegotiationRequest,
    /// Anything else; left for the session handler.
    Passthrough,
}

impl FrameKind {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::NegotiationRequest => "negotiation_request",
            FrameKind::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when `frame` is exactly the negotiation request.
pub fn is_negotiation_request(frame: &[u8]) -> bool {
    frame == NEGOTIATION_REQUEST
}

/// Classify a frame.
pub fn classify(frame: &[u8]) -> FrameKind {
    if is_negotiation_request(frame) {
        FrameKind::NegotiationRequest
    } else {
        FrameKind::Passthrough
    }
}
