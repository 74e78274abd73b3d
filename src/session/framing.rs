//! Protocol message framing.
//!
//! # Frame Layouts
//! ```text
//! startup phase:  len:i32 | body            (len counts itself)
//! query phase:    tag:u8 | len:i32 | body   (len excludes the tag)
//! ```
//!
//! # Design Decisions
//! - An 8-byte startup frame keeps the codec in the startup phase: both
//!   encryption negotiation requests are exactly 8 bytes and are followed by
//!   another untyped frame
//! - Frames are passed on whole and unparsed; the engine interprets them

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::ProtocolError;

/// Maximum message size in bytes (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const NEGOTIATION_FRAME_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Startup,
    Query,
}

/// Splits a byte stream into raw protocol messages and writes raw replies.
#[derive(Debug)]
pub struct MessageCodec {
    phase: Phase,
    max_message_size: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            phase: Phase::Startup,
            max_message_size,
        }
    }

    /// Whether the next frame is decoded as an untyped startup frame.
    pub fn in_startup_phase(&self) -> bool {
        self.phase == Phase::Startup
    }

    /// Whether a framed message is `Terminate`.
    pub fn is_terminate(message: &[u8]) -> bool {
        message.first() == Some(&b'X')
    }

    fn decode_startup(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let len = i32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len < 8 || len > self.max_message_size {
            return Err(ProtocolError::InvalidLength(len));
        }
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        if len != NEGOTIATION_FRAME_LEN {
            self.phase = Phase::Query;
        }
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_typed(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if src.len() < 5 {
            return Ok(None);
        }

        let len = i32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        if len < 4 || len > self.max_message_size {
            return Err(ProtocolError::InvalidLength(len));
        }

        let total = 1 + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        Ok(Some(src.split_to(total).freeze()))
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.phase {
            Phase::Startup => self.decode_startup(src),
            Phase::Query => self.decode_typed(src),
        }
    }
}

impl Encoder<Bytes> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
