//! Error types for the session engine.

use std::io;

use onkyo_descriptor::{DescriptorError, ZoneId};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while driving a receiver session.
///
/// Lifecycle callbacks never surface these; they log and retry on the next
/// tick. Host commands return them so the caller can report a rejected
/// command.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Socket bind, send or receive failure
    #[error("Network error: {0}")]
    Network(#[from] io::Error),

    /// The receiver's XML descriptor could not be used
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// The session has not finished its handshake
    #[error("Session is not ready")]
    NotReady,

    /// No device is mapped to this unit id
    #[error("Unknown unit: {0}")]
    UnknownUnit(u8),

    /// The zone is absent or disabled on this receiver
    #[error("Zone unavailable: {0}")]
    ZoneUnavailable(ZoneId),

    /// The device does not accept this command
    #[error("Unsupported command {command:?} for unit {unit}")]
    UnsupportedCommand { unit: u8, command: String },

    /// A selector level that has no option name
    #[error("No option at level {0}")]
    UnknownOption(u32),

    /// An option name that matches no input selector
    #[error("Unknown input selector: {0}")]
    UnknownSelector(String),

    /// A label that matches no listening mode
    #[error("Unknown listening mode: {0}")]
    UnknownListeningMode(String),

    /// A tuner preset label without a leading preset number
    #[error("Invalid tuner preset label: {0}")]
    InvalidPresetLabel(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Config(String),
}
