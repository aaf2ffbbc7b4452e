//! eISCP frame layout and encoding.
//!
//! Every ISCP message travels inside a fixed 16-byte header:
//!
//! ```text
//! 0        4               8               12        13        16
//! +--------+---------------+---------------+---------+---------+------------------+
//! | "ISCP" | header length | data length   | version | 0  0  0 | message  CR LF   |
//! |        | u32 BE (= 16) | u32 BE        | u8      |         |                  |
//! +--------+---------------+---------------+---------+---------+------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Magic bytes opening every frame.
pub const MAGIC: &[u8; 4] = b"ISCP";

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 16;

/// Protocol version written by the encoder.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Line terminator appended after the message.
pub const LINE_TERMINATOR: &[u8; 2] = b"\r\n";

/// A decoded eISCP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Version byte from the header
    pub version: u8,
    /// ISCP message text, e.g. `!1PWR01`, with terminators stripped
    pub message: String,
}

impl Frame {
    /// Create a frame carrying `message` at the current protocol version.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            message: message.into(),
        }
    }

    /// The ISCP message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Encode this frame's message for the wire.
    pub fn encode(&self) -> Bytes {
        encode(&self.message)
    }
}

/// Encode an ISCP command into a wire frame.
///
/// The data-length field counts the command plus one terminator byte, and
/// the command is followed by CR LF.
pub fn encode(command: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + command.len() + LINE_TERMINATOR.len());
    buf.put_slice(MAGIC);
    buf.put_u32(HEADER_LEN as u32);
    buf.put_u32(command.len() as u32 + 1);
    buf.put_u8(PROTOCOL_VERSION);
    buf.put_slice(&[0, 0, 0]);
    buf.put_slice(command.as_bytes());
    buf.put_slice(LINE_TERMINATOR);
    buf.freeze()
}
