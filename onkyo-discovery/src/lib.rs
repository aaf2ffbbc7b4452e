//! Onkyo/Integra receiver discovery
//!
//! Receivers answer a UDP broadcast of `!xECNQSTN` on port 60128 with their
//! model, control port, region and MAC address.
//!
//! Two ways to use this crate:
//!
//! - [`EcnSocket`] and [`parse_response`] for callers that poll a socket
//!   themselves (the session engine does this once per tick).
//! - [`get`], [`get_with_timeout`] and [`get_iter_with_timeout`] for a
//!   one-shot blocking search.
//!
//! # Quick Start
//!
//! ```no_run
//! use onkyo_discovery::get;
//!
//! for receiver in get() {
//!     println!("Found {} at {}:{}", receiver.model, receiver.ip_address, receiver.port);
//! }
//! ```

mod discovery;
mod ecn;
mod error;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub use discovery::DiscoveryIterator;
pub use ecn::{
    discovery_request, is_drained, parse_response, EcnResponseIterator, EcnSocket,
    DISCOVERY_QUERY,
};
pub use error::{DiscoveryError, Result};

/// UDP port receivers listen on for discovery queries.
pub const DISCOVERY_PORT: u16 = 60128;

/// Sales region reported by a receiver. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Region {
    /// `DX`
    NorthAmerica,
    /// `JJ`
    Japan,
    /// `XX`
    EuropeAsia,
    Other(String),
}

impl Region {
    pub fn from_code(code: &str) -> Self {
        match code {
            "DX" => Region::NorthAmerica,
            "JJ" => Region::Japan,
            "XX" => Region::EuropeAsia,
            other => Region::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Region::NorthAmerica => "DX",
            Region::Japan => "JJ",
            Region::EuropeAsia => "XX",
            Region::Other(code) => code,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::NorthAmerica => write!(f, "North American model"),
            Region::Japan => write!(f, "Japanese model"),
            Region::EuropeAsia => write!(f, "European or Asian model"),
            Region::Other(code) => write!(f, "region {}", code),
        }
    }
}

/// A receiver that answered discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverIdentity {
    /// Source address of the response datagram
    pub ip_address: IpAddr,
    /// TCP control port
    pub port: u16,
    pub model: String,
    pub region: Region,
    /// Twelve uppercase hex digits
    pub mac_address: String,
}

impl ReceiverIdentity {
    /// Address of the TCP control channel.
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip_address, self.port)
    }
}

/// Events emitted during discovery.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    Found(ReceiverIdentity),
}

/// Discover receivers with a default 3-second timeout.
pub fn get() -> Vec<ReceiverIdentity> {
    get_with_timeout(Duration::from_secs(3))
}

/// Discover receivers, waiting up to `timeout` between responses.
pub fn get_with_timeout(timeout: Duration) -> Vec<ReceiverIdentity> {
    get_iter_with_timeout(timeout)
        .map(|event| match event {
            DiscoveryEvent::Found(receiver) => receiver,
        })
        .collect()
}

/// Get an iterator for discovering receivers with a custom timeout.
///
/// If the discovery port cannot be bound the iterator is empty; the
/// failure is logged.
pub fn get_iter_with_timeout(timeout: Duration) -> DiscoveryIterator {
    DiscoveryIterator::new(timeout).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discovery unavailable");
        DiscoveryIterator::empty()
    })
}
