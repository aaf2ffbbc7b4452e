//! eISCP frame codec
//!
//! Encodes ISCP command strings into eISCP frames and decodes a TCP or UDP
//! byte stream back into frames, tolerating garbage prefixes and frames that
//! arrive split across reads.
//!
//! # Quick Start
//!
//! ```
//! use eiscp_codec::{encode, FrameDecoder};
//!
//! let wire = encode("!1PWRQSTN");
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.push(&wire[..10]);
//! assert!(decoder.drain().is_empty());
//!
//! decoder.push(&wire[10..]);
//! let frames = decoder.drain();
//! assert_eq!(frames[0].message, "!1PWRQSTN");
//! ```

mod decoder;
mod frame;

pub use decoder::{
    try_decode, CodecConfig, Decoded, FrameDecoder, DEFAULT_END_OF_MESSAGE, DEFAULT_MAX_DATA_LEN,
    LEGACY_END_OF_MESSAGE,
};
pub use frame::{encode, Frame, HEADER_LEN, LINE_TERMINATOR, MAGIC, PROTOCOL_VERSION};
