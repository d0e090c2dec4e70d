//! Frame encoding and decoding for the AppFire protocol.
//!
//! The wire format uses a simple framing protocol:
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────┬────────────┐
//! │   0xa5   │   kind   │   len    │   payload   │  checksum  │
//! │  1 byte  │  1 byte  │  1 byte  │  len bytes  │   1 byte   │
//! └──────────┴──────────┴──────────┴─────────────┴────────────┘
//! ```
//!
//! The checksum is the wrapping 8-bit sum of every byte before it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Frame start byte.
pub const FRAME_START: u8 = 0xa5;

/// Maximum frame payload size.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

/// Header size (start + kind + length).
pub const HEADER_SIZE: usize = 3;

/// Minimum frame size (header + checksum, empty payload).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 1;

/// A frame that passed checksum and length validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message kind byte.
    pub kind: u8,
    /// Payload bytes.
    pub payload: Bytes,
}

/// Computes the checksum over `data`.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Encodes a payload into a framed message.
///
/// # Panics
///
/// Panics if the payload exceeds `MAX_PAYLOAD_SIZE`.
#[must_use]
pub fn encode(kind: u8, payload: &[u8]) -> Bytes {
    assert!(
        payload.len() <= MAX_PAYLOAD_SIZE,
        "payload exceeds maximum frame size"
    );

    let mut buf = BytesMut::with_capacity(MIN_FRAME_SIZE + payload.len());
    buf.put_u8(FRAME_START);
    buf.put_u8(kind);
    buf.put_u8(u8::try_from(payload.len()).expect("length checked above"));
    buf.put_slice(payload);
    let sum = checksum(&buf);
    buf.put_u8(sum);
    buf.freeze()
}

/// Validates a complete frame and splits it into kind and payload.
///
/// The checksum is verified before anything else is looked at, so a
/// corrupted frame never yields a partially decoded value.
pub fn verify(data: &[u8]) -> Result<Frame, FrameError> {
    if data.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            min: MIN_FRAME_SIZE,
            got: data.len(),
        });
    }

    let (body, trailer) = data.split_at(data.len() - 1);
    let expected = checksum(body);
    if trailer[0] != expected {
        return Err(FrameError::Checksum {
            expected,
            actual: trailer[0],
        });
    }

    if body[0] != FRAME_START {
        return Err(FrameError::InvalidStart(body[0]));
    }

    let declared = usize::from(body[2]);
    let actual = body.len() - HEADER_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    Ok(Frame {
        kind: body[1],
        payload: Bytes::copy_from_slice(&body[HEADER_SIZE..]),
    })
}

/// Frame decoder that reassembles frames from a byte stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to extract the next complete raw frame.
    ///
    /// Bytes before the start marker are discarded. The returned frame
    /// still carries its checksum; run it through [`verify`].
    pub fn decode(&mut self) -> Option<Bytes> {
        let skipped = self
            .buffer
            .iter()
            .position(|&b| b == FRAME_START)
            .unwrap_or(self.buffer.len());
        if skipped > 0 {
            tracing::debug!("skipping {} bytes before frame start", skipped);
            self.buffer.advance(skipped);
        }

        if self.buffer.len() < HEADER_SIZE {
            return None;
        }

        let total_frame_size = MIN_FRAME_SIZE + usize::from(self.buffer[2]);
        if self.buffer.len() < total_frame_size {
            return None;
        }

        Some(self.buffer.split_to(total_frame_size).freeze())
    }

    /// Returns the size of the frame currently being assembled, if its
    /// header has arrived.
    #[must_use]
    pub fn pending_frame_size(&self) -> Option<usize> {
        (self.buffer.len() >= HEADER_SIZE).then(|| MIN_FRAME_SIZE + usize::from(self.buffer[2]))
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
