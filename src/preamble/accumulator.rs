//! Pending-byte accumulation for preamble classification.
//!
//! # Invariants
//! - Bytes are kept in arrival order
//! - Nothing is discarded: bytes are either consumed as the classified frame
//!   or handed back as the unread remainder

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::preamble::matcher::FRAME_LEN;

/// Result of feeding bytes into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulated {
    /// Fewer than [`FRAME_LEN`] bytes are buffered.
    NeedMore,
    /// The first [`FRAME_LEN`] bytes, ready to classify.
    Frame([u8; FRAME_LEN]),
}

/// Bytes read from a connection but not yet classified.
#[derive(Debug, Default)]
pub struct PreambleBuffer {
    pending: BytesMut,
}

impl PreambleBuffer {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(FRAME_LEN),
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Append a chunk and report whether a frame is available.
    pub fn push(&mut self, chunk: &[u8]) -> Accumulated {
        self.pending.extend_from_slice(chunk);
        self.frame()
    }

    /// The classification frame, if enough bytes are buffered.
    pub fn frame(&self) -> Accumulated {
        match self.pending.get(..FRAME_LEN) {
            Some(head) => {
                let mut frame = [0u8; FRAME_LEN];
                frame.copy_from_slice(head);
                Accumulated::Frame(frame)
            }
            None => Accumulated::NeedMore,
        }
    }

    /// Read from `reader` until a frame is available.
    ///
    /// Returns `None` if the peer closes first.
    pub async fn accumulate<R>(&mut self, reader: &mut R) -> std::io::Result<Option<[u8; FRAME_LEN]>>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Accumulated::Frame(frame) = self.frame() {
                return Ok(Some(frame));
            }
            if reader.read_buf(&mut self.pending).await? == 0 {
                return Ok(None);
            }
        }
    }

    /// Drop the classified frame from the front of the buffer.
    ///
    /// Must only be called after [`frame`](Self::frame) returned a frame.
    pub fn consume_frame(&mut self) {
        debug_assert!(self.pending.len() >= FRAME_LEN);
        self.pending.advance(FRAME_LEN.min(self.pending.len()));
    }

    /// Everything still buffered, in arrival order.
    pub fn into_remainder(self) -> Bytes {
        self.pending.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::matcher::NEGOTIATION_REQUEST;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn needs_eight_bytes() {
        let mut buffer = PreambleBuffer::new();
        assert_eq!(buffer.push(&[0, 0, 0]), Accumulated::NeedMore);
        assert_eq!(buffer.push(&[8, 4, 0xd2, 0x16]), Accumulated::NeedMore);
        assert_eq!(buffer.push(&[0x2f]), Accumulated::Frame(NEGOTIATION_REQUEST));
    }

    #[test]
    fn keeps_bytes_beyond_frame() {
        let mut buffer = PreambleBuffer::new();
        buffer.push(&NEGOTIATION_REQUEST[..3]);
        buffer.push(&NEGOTIATION_REQUEST[3..]);
        buffer.push(&[0xaa, 0xbb]);

        buffer.consume_frame();
        assert_eq!(&buffer.into_remainder()[..], &[0xaa, 0xbb]);
    }

    #[test]
    fn unconsumed_frame_stays_in_remainder() {
        let mut buffer = PreambleBuffer::new();
        let input = [0, 0, 0, 9, 1, 2, 3, 4, 5];
        assert!(matches!(buffer.push(&input), Accumulated::Frame(_)));
        assert_eq!(&buffer.into_remainder()[..], &input);
    }

    #[tokio::test]
    async fn accumulate_across_fragments() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for byte in NEGOTIATION_REQUEST {
                client.write_all(&[byte]).await.unwrap();
                tokio::task::yield_now().await;
            }
            client.write_all(&[0xcc]).await.unwrap();
            client
        });

        let mut buffer = PreambleBuffer::new();
        let frame = buffer.accumulate(&mut server).await.unwrap();
        assert_eq!(frame, Some(NEGOTIATION_REQUEST));
        let _client = writer.await.unwrap();
    }

    #[tokio::test]
    async fn accumulate_reports_early_close() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0, 8]).await.unwrap();
        drop(client);

        let mut buffer = PreambleBuffer::new();
        assert_eq!(buffer.accumulate(&mut server).await.unwrap(), None);
        assert_eq!(buffer.len(), 4);
    }
}
