//! Frame reassembly and outbound framing.
//!
//! Every frame on the stream is a marker byte, a 2-byte little-endian
//! payload length, then exactly that many payload bytes:
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | marker | len_lo | len_hi | payload[0..len]   |
//! +--------+--------+--------+-------------------+
//! ```
//!
//! The device marks its frames with `'>'`, the host with `'<'`. Transports
//! deliver the stream in arbitrary chunks, so header and payload may be split
//! anywhere.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::constants::*;

/// Reassembles chunked stream bytes into complete frame payloads.
///
/// The reassembler tops up a 3-byte header, then tops up the payload until
/// `frame_size` bytes are buffered. A single chunk may complete zero, one or
/// many frames; leftover bytes always carry over to the next frame.
///
/// While hunting for a header, bytes that are not the expected marker are
/// skipped. A header advertising more than `max_frame_len` bytes is treated
/// as corrupt: its marker byte is dropped and the two length bytes are
/// rescanned for the next marker. The state machine consumes the stream one
/// header byte at a time, so the outcome never depends on chunk boundaries.
#[derive(Debug)]
pub struct FrameReassembler {
    marker: u8,
    max_frame_len: usize,
    header: [u8; FRAME_HEADER_SIZE],
    header_len: usize,
    frame_size: usize,
    in_frame: BytesMut,
    discarded: u64,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    /// Create a reassembler for device → host frames.
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    /// Create a reassembler with a custom payload bound.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        FrameReassembler {
            marker: FRAME_MARKER_INBOUND,
            max_frame_len,
            header: [0u8; FRAME_HEADER_SIZE],
            header_len: 0,
            frame_size: 0,
            in_frame: BytesMut::with_capacity(max_frame_len.min(MAX_FRAME_LEN)),
            discarded: 0,
        }
    }

    /// Feed one chunk from the transport and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        loop {
            if self.header_len < FRAME_HEADER_SIZE {
                let Some((&byte, tail)) = rest.split_first() else {
                    break;
                };
                rest = tail;
                self.push_header_byte(byte);
                if self.header_len < FRAME_HEADER_SIZE {
                    continue;
                }
            }

            let needed = self.frame_size - self.in_frame.len();
            let take = needed.min(rest.len());
            self.in_frame.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.in_frame.len() < self.frame_size {
                // Chunk exhausted mid-payload.
                break;
            }

            let frame = self.in_frame.split().to_vec();
            trace!(len = frame.len(), "frame complete");
            frames.push(frame);
            self.header_len = 0;
            self.frame_size = 0;
        }

        frames
    }

    fn push_header_byte(&mut self, byte: u8) {
        if self.header_len == 0 && byte != self.marker {
            self.discarded += 1;
            trace!(byte, "skipping byte outside of a frame");
            return;
        }

        self.header[self.header_len] = byte;
        self.header_len += 1;

        if self.header_len == FRAME_HEADER_SIZE {
            let len = u16::from_le_bytes([self.header[1], self.header[2]]) as usize;
            if len > self.max_frame_len {
                debug!(
                    len,
                    max = self.max_frame_len,
                    "implausible frame length, resynchronizing"
                );
                let pending = [self.header[1], self.header[2]];
                self.header_len = 0;
                self.discarded += 1;
                // At most two bytes go back in, so this cannot complete a header.
                for b in pending {
                    self.push_header_byte(b);
                }
            } else {
                self.frame_size = len;
                self.in_frame.reserve(len);
            }
        }
    }

    /// Number of bytes buffered for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.header_len + self.in_frame.len()
    }

    /// Whether the reassembler is between frames.
    pub fn is_idle(&self) -> bool {
        self.header_len == 0
    }

    /// Total bytes dropped while resynchronizing.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.header_len = 0;
        self.frame_size = 0;
        self.in_frame.clear();
    }
}

/// Frame a payload for host → device transmission.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    encode_frame_with_marker(FRAME_MARKER_OUTBOUND, payload)
}

/// Frame a payload behind an arbitrary marker byte.
pub fn encode_frame_with_marker(marker: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= u16::MAX as usize);
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.push(marker);
    buf.put_u16_le(payload.len() as u16);
    buf.extend_from_slice(payload);
    buf
}
