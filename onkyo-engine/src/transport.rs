//! Network seam
//!
//! The engine never touches sockets directly. A [`Network`] owns the TCP
//! control channel and hands out [`DiscoverySocket`]s; the host runtime
//! reports connect, receive and disconnect events back through the
//! engine's lifecycle methods.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// UDP socket used for receiver discovery.
pub trait DiscoverySocket {
    /// Broadcast `payload` to `port`.
    fn broadcast(&mut self, payload: &[u8], port: u16) -> io::Result<()>;

    /// Receive one datagram. `WouldBlock` or `TimedOut` means nothing is pending.
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

/// Transport services for one receiver session.
pub trait Network {
    type Discovery: DiscoverySocket;

    /// Bind a broadcast-capable socket on `port` with address reuse and a
    /// short read timeout.
    fn bind_discovery(&mut self, port: u16, recv_timeout: Duration) -> io::Result<Self::Discovery>;

    /// Start connecting to the control channel. Success is reported later
    /// through `Engine::on_connected`.
    fn connect(&mut self, addr: SocketAddr) -> io::Result<()>;

    /// Queue an encoded frame, to be written after `delay`.
    fn send(&mut self, frame: &[u8], delay: Duration) -> io::Result<()>;

    /// Close the control channel, dropping queued frames.
    fn disconnect(&mut self);
}
