//! Configuration types for the session engine
//!
//! [`EngineConfig`] controls tick cadence, discovery socket behavior and the
//! frame codec's end-of-message sentinel.

use std::time::Duration;

use eiscp_codec::{CodecConfig, DEFAULT_END_OF_MESSAGE, DEFAULT_MAX_DATA_LEN, LEGACY_END_OF_MESSAGE};
use onkyo_descriptor::DEFAULT_MAX_VOLUME;
use onkyo_discovery::DISCOVERY_PORT;

use crate::error::{EngineError, Result};

/// Configuration for the [`Engine`](crate::Engine)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// UDP port discovery queries are broadcast to and received on
    /// Default: 60128
    pub discovery_port: u16,

    /// Read timeout of the discovery socket
    /// Default: 100 milliseconds
    pub discovery_recv_timeout: Duration,

    /// Tick cadence requested from the host until the session is ready
    /// Default: 2 seconds
    pub startup_tick_interval: Duration,

    /// Tick cadence requested once the session is ready
    /// Default: 20 seconds
    pub steady_tick_interval: Duration,

    /// Gap between the initial status queries
    /// Default: 1 second
    pub query_stagger: Duration,

    /// Byte that ends an ISCP message inside a frame
    /// Default: 0x1A
    pub end_of_message: u8,

    /// Maximum volume assumed for zones that do not declare one
    /// Default: 80
    pub default_max_volume: u8,

    /// Frames declaring a larger payload are treated as garbage
    /// Default: 1 MiB
    pub max_frame_data_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discovery_port: DISCOVERY_PORT,
            discovery_recv_timeout: Duration::from_millis(100),
            startup_tick_interval: Duration::from_secs(2),
            steady_tick_interval: Duration::from_secs(20),
            query_stagger: Duration::from_secs(1),
            end_of_message: DEFAULT_END_OF_MESSAGE,
            default_max_volume: DEFAULT_MAX_VOLUME,
            max_frame_data_len: DEFAULT_MAX_DATA_LEN,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorter startup cadence and query stagger, for receivers that
    /// answer quickly
    pub fn fast_startup() -> Self {
        Self {
            startup_tick_interval: Duration::from_millis(500),
            query_stagger: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Older receivers end messages with 0x17 instead of 0x1A
    pub fn legacy_terminator() -> Self {
        Self {
            end_of_message: LEGACY_END_OF_MESSAGE,
            ..Default::default()
        }
    }

    /// Codec settings derived from this configuration
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            end_of_message: self.end_of_message,
            max_data_len: self.max_frame_data_len,
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.discovery_port == 0 {
            return Err(EngineError::Config(
                "Discovery port must be greater than 0".to_string(),
            ));
        }

        if self.discovery_recv_timeout == Duration::ZERO {
            return Err(EngineError::Config(
                "Discovery receive timeout must be greater than 0".to_string(),
            ));
        }

        if self.startup_tick_interval == Duration::ZERO
            || self.steady_tick_interval == Duration::ZERO
        {
            return Err(EngineError::Config(
                "Tick intervals must be greater than 0".to_string(),
            ));
        }

        if self.startup_tick_interval > self.steady_tick_interval {
            return Err(EngineError::Config(
                "Startup tick interval must not exceed the steady interval".to_string(),
            ));
        }

        if self.default_max_volume == 0 {
            return Err(EngineError::Config(
                "Default max volume must be greater than 0".to_string(),
            ));
        }

        if matches!(self.end_of_message, b'\r' | b'\n' | b'!') || self.end_of_message.is_ascii_alphanumeric() {
            return Err(EngineError::Config(format!(
                "End-of-message byte 0x{:02X} collides with message text",
                self.end_of_message
            )));
        }

        if self.max_frame_data_len == 0 {
            return Err(EngineError::Config(
                "Max frame data length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
