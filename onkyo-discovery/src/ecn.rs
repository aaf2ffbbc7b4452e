//! ECN (receiver identity) query and response handling
//!
//! Receivers listen for `!xECNQSTN` broadcasts on UDP port 60128 and answer
//! with `!1ECN<model>/<port>/<region>/<mac>` wrapped in an eISCP frame.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use eiscp_codec::{encode, try_decode, CodecConfig};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};

use crate::error::{DiscoveryError, Result};
use crate::{ReceiverIdentity, Region};

/// ISCP message broadcast to find receivers.
pub const DISCOVERY_QUERY: &str = "!xECNQSTN";

const ECN_CODE: &str = "ECN";
const RECEIVER_DEVICE_TYPE: char = '1';
const MAC_LEN: usize = 12;

/// Encoded discovery request frame.
pub fn discovery_request() -> Bytes {
    encode(DISCOVERY_QUERY)
}

/// UDP socket used to broadcast discovery queries and collect answers.
pub struct EcnSocket {
    socket: UdpSocket,
}

impl EcnSocket {
    /// Bind to `port` on all interfaces with broadcast and address reuse enabled.
    pub fn bind(port: u16, timeout: Duration) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create UDP socket: {}", e)))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to enable address reuse: {}", e)))?;

        socket
            .set_broadcast(true)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to enable broadcast: {}", e)))?;

        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set read timeout: {}", e)))?;

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP port {}: {}", port, e)))?;

        debug!(port, timeout_ms = timeout.as_millis() as u64, "Discovery socket bound");
        Ok(Self {
            socket: socket.into(),
        })
    }

    /// Broadcast raw bytes to `port` on the limited broadcast address.
    pub fn broadcast(&self, payload: &[u8], port: u16) -> io::Result<usize> {
        let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port);
        self.socket.send_to(payload, target)
    }

    /// Broadcast the discovery query.
    pub fn send_query(&self, port: u16) -> Result<()> {
        self.broadcast(&discovery_request(), port)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to send discovery query: {}", e)))?;
        Ok(())
    }

    /// Receive one datagram. Fails with `WouldBlock`/`TimedOut` once drained.
    pub fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }

    /// Iterate over valid receiver identities until the socket is drained.
    pub fn responses<'a>(&'a self, config: &'a CodecConfig) -> EcnResponseIterator<'a> {
        EcnResponseIterator::new(&self.socket, config)
    }
}

/// Iterator for ECN responses
pub struct EcnResponseIterator<'a> {
    socket: &'a UdpSocket,
    config: &'a CodecConfig,
    buffer: [u8; 2048],
    finished: bool,
}

impl<'a> EcnResponseIterator<'a> {
    fn new(socket: &'a UdpSocket, config: &'a CodecConfig) -> Self {
        Self {
            socket,
            config,
            buffer: [0; 2048],
            finished: false,
        }
    }
}

impl<'a> Iterator for EcnResponseIterator<'a> {
    type Item = Result<ReceiverIdentity>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((size, source)) => {
                    if let Some(identity) =
                        parse_response(&self.buffer[..size], source.ip(), self.config)
                    {
                        return Some(Ok(identity));
                    }
                }
                Err(e) if is_drained(&e) => self.finished = true,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(DiscoveryError::NetworkError(format!(
                        "Socket error: {}",
                        e
                    ))));
                }
            }
        }
        None
    }
}

/// Whether a receive error just means no datagram is pending.
pub fn is_drained(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Parse one discovery datagram received from `source`.
///
/// Returns `None` for anything that is not a receiver's ECN answer,
/// including our own query echoed back on the shared port.
pub fn parse_response(datagram: &[u8], source: IpAddr, config: &CodecConfig) -> Option<ReceiverIdentity> {
    let decoded = try_decode(datagram, config);
    let text = match decoded.frame {
        Some(frame) => frame.message,
        None => String::from_utf8_lossy(datagram).into_owned(),
    };

    match parse_message(&text, source) {
        Ok(identity) => Some(identity),
        Err(e) => {
            trace!(source = %source, error = %e, "Ignoring discovery datagram");
            None
        }
    }
}

fn parse_message(text: &str, source: IpAddr) -> Result<ReceiverIdentity> {
    if !text.contains(ECN_CODE) {
        return Err(DiscoveryError::ParseError("no ECN marker".to_string()));
    }

    let start = text
        .find('!')
        .ok_or_else(|| DiscoveryError::ParseError("no message start".to_string()))?;
    let message = &text[start + 1..];

    let mut chars = message.chars();
    if chars.next() != Some(RECEIVER_DEVICE_TYPE) {
        return Err(DiscoveryError::ParseError("not a receiver response".to_string()));
    }
    let body = chars
        .as_str()
        .strip_prefix(ECN_CODE)
        .ok_or_else(|| DiscoveryError::ParseError("not an ECN message".to_string()))?;

    let mut fields = body.splitn(4, '/');
    let model = fields.next().unwrap_or_default().trim();
    let port = fields.next().unwrap_or_default().trim();
    let region = fields.next().unwrap_or_default().trim();
    let tail = fields.next().unwrap_or_default();

    if model.is_empty() {
        return Err(DiscoveryError::ParseError("empty model name".to_string()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| DiscoveryError::ParseError(format!("invalid port {:?}", port)))?;
    let mac = tail
        .get(..MAC_LEN)
        .filter(|mac| mac.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| DiscoveryError::ParseError(format!("invalid MAC {:?}", tail)))?;

    Ok(ReceiverIdentity {
        ip_address: source,
        port,
        model: model.to_string(),
        region: Region::from_code(region),
        mac_address: mac.to_uppercase(),
    })
}
