//! Streaming frame decoder.
//!
//! Receivers deliver frames over TCP in arbitrary chunks, so decoding works
//! on an accumulating buffer: bytes before the `ISCP` magic are garbage and
//! dropped, an incomplete frame is left in place until more bytes arrive,
//! and every complete frame is drained in order.

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::frame::{Frame, HEADER_LEN, MAGIC};

/// End-of-message byte sent by current receiver firmware.
pub const DEFAULT_END_OF_MESSAGE: u8 = 0x1A;

/// End-of-message byte used by older protocol revisions.
pub const LEGACY_END_OF_MESSAGE: u8 = 0x17;

/// Largest data length accepted before a header is treated as garbage.
pub const DEFAULT_MAX_DATA_LEN: usize = 1024 * 1024;

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Sentinel byte terminating the message inside the data region
    pub end_of_message: u8,
    /// Upper bound on the declared data length
    pub max_data_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            end_of_message: DEFAULT_END_OF_MESSAGE,
            max_data_len: DEFAULT_MAX_DATA_LEN,
        }
    }
}

impl CodecConfig {
    /// Settings for receivers terminating messages with the legacy sentinel.
    pub fn legacy() -> Self {
        Self {
            end_of_message: LEGACY_END_OF_MESSAGE,
            ..Default::default()
        }
    }
}

/// Outcome of a single decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded frame, or `None` when the buffer holds no complete frame
    pub frame: Option<Frame>,
    /// Bytes to remove from the front of the buffer (garbage plus frame)
    pub consumed: usize,
}

enum Candidate {
    Complete(Frame, usize),
    Incomplete,
    Invalid,
}

/// Try to decode one frame from the front of `buf`.
///
/// Never fails: an incomplete frame yields `frame: None` and consumes only
/// the garbage that preceded it.
pub fn try_decode(buf: &[u8], config: &CodecConfig) -> Decoded {
    let mut start = 0;

    loop {
        let Some(offset) = find_magic(&buf[start..]) else {
            let keep = partial_magic_len(&buf[start..]);
            return Decoded {
                frame: None,
                consumed: buf.len() - keep,
            };
        };
        start += offset;

        match parse_candidate(&buf[start..], config) {
            Candidate::Complete(frame, len) => {
                return Decoded {
                    frame: Some(frame),
                    consumed: start + len,
                }
            }
            Candidate::Incomplete => {
                return Decoded {
                    frame: None,
                    consumed: start,
                }
            }
            // A magic match with an impossible header: skip past it and rescan.
            Candidate::Invalid => start += 1,
        }
    }
}

fn parse_candidate(candidate: &[u8], config: &CodecConfig) -> Candidate {
    if candidate.len() < HEADER_LEN {
        return Candidate::Incomplete;
    }

    let header_len = read_u32(&candidate[4..8]) as usize;
    let data_len = read_u32(&candidate[8..12]) as usize;
    // Every protocol revision uses a 16-byte header.
    if header_len != HEADER_LEN || data_len > config.max_data_len {
        trace!(header_len, data_len, "Rejecting implausible frame header");
        return Candidate::Invalid;
    }

    let total = header_len + data_len;
    if candidate.len() < total {
        return Candidate::Incomplete;
    }

    let region = &candidate[header_len..total];
    let mut consumed = total;

    // The declared length counts a single terminator byte; when that byte is
    // the CR of a CR LF pair, the LF belongs to this frame too.
    if region.last() == Some(&b'\r') {
        match candidate.get(total) {
            Some(b'\n') => consumed += 1,
            Some(_) => {}
            None => return Candidate::Incomplete,
        }
    }

    let frame = Frame {
        version: candidate[12],
        message: extract_message(region, config.end_of_message),
    };

    Candidate::Complete(frame, consumed)
}

/// Isolate the message text from a frame's data region.
fn extract_message(region: &[u8], end_of_message: u8) -> String {
    let end = match region.iter().position(|&b| b == end_of_message) {
        Some(pos) => pos,
        None => {
            let trailing = region
                .iter()
                .rev()
                .take_while(|&&b| matches!(b, b'\r' | b'\n' | 0))
                .count();
            region.len() - trailing
        }
    };

    String::from_utf8_lossy(&region[..end]).into_owned()
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC.len()).position(|w| w == MAGIC)
}

/// Length of the longest suffix of `buf` that could start a magic sequence.
fn partial_magic_len(buf: &[u8]) -> usize {
    (1..MAGIC.len())
        .rev()
        .find(|&k| buf.ends_with(&MAGIC[..k]))
        .unwrap_or(0)
}

/// Accumulating decoder over a byte stream.
///
/// After [`FrameDecoder::drain`] returns, the buffer holds either nothing or
/// the prefix of a frame that has not fully arrived yet.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    config: CodecConfig,
}

impl FrameDecoder {
    /// Create a decoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with custom settings.
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            buffer: BytesMut::new(),
            config,
        }
    }

    /// Append received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decode the next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let decoded = try_decode(&self.buffer, &self.config);

        if decoded.consumed > 0 {
            if decoded.frame.is_none() {
                debug!(bytes = decoded.consumed, "Discarding garbage from input buffer");
            }
            self.buffer.advance(decoded.consumed);
        }

        decoded.frame
    }

    /// Decode every complete frame currently buffered.
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Number of bytes waiting in the buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}
