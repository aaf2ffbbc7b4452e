//! Blocking discovery iterator.
//!
//! Sends one ECN query, then yields every distinct receiver that answers
//! before the socket's read timeout expires.

use std::collections::HashSet;
use std::time::Duration;

use eiscp_codec::CodecConfig;
use tracing::{debug, warn};

use crate::ecn::EcnSocket;
use crate::error::Result;
use crate::{DiscoveryEvent, DISCOVERY_PORT};

/// Iterator that discovers receivers on the local network.
///
/// Responses are deduplicated by MAC address, so a receiver answering on
/// several interfaces is reported once.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use onkyo_discovery::{get_iter_with_timeout, DiscoveryEvent};
///
/// for event in get_iter_with_timeout(Duration::from_secs(3)) {
///     match event {
///         DiscoveryEvent::Found(receiver) => {
///             println!("Found: {}", receiver.model);
///         }
///     }
/// }
/// ```
pub struct DiscoveryIterator {
    socket: Option<EcnSocket>,
    config: CodecConfig,
    buffer: Vec<DiscoveryEvent>,
    seen_macs: HashSet<String>,
}

impl DiscoveryIterator {
    /// Bind the discovery port and broadcast a query.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_port(DISCOVERY_PORT, timeout)
    }

    pub fn with_port(port: u16, timeout: Duration) -> Result<Self> {
        let socket = EcnSocket::bind(port, timeout)?;
        socket.send_query(port)?;

        Ok(Self {
            socket: Some(socket),
            config: CodecConfig::default(),
            buffer: Vec::new(),
            seen_macs: HashSet::new(),
        })
    }

    /// An iterator that yields nothing. Used when the socket cannot be set up.
    pub(crate) fn empty() -> Self {
        Self {
            socket: None,
            config: CodecConfig::default(),
            buffer: Vec::new(),
            seen_macs: HashSet::new(),
        }
    }

    fn fill_buffer(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        for result in socket.responses(&self.config) {
            match result {
                Ok(identity) => {
                    if !self.seen_macs.insert(identity.mac_address.clone()) {
                        continue;
                    }
                    debug!(model = %identity.model, address = %identity.ip_address, "Receiver answered discovery");
                    self.buffer.push(DiscoveryEvent::Found(identity));
                }
                Err(e) => warn!(error = %e, "Discovery receive failed"),
            }
        }
        self.buffer.reverse();
    }
}

impl Iterator for DiscoveryIterator {
    type Item = DiscoveryEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.socket.is_some() {
            self.fill_buffer();
        }
        self.buffer.pop()
    }
}
