//! Non-blocking socket implementation of the engine's network seam.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use onkyo_discovery::{DiscoveryError, EcnSocket};
use onkyo_engine::{DiscoverySocket, Network};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_BUFFER_LEN: usize = 4096;

/// Transport events for the run loop to hand to the engine.
#[derive(Debug, PartialEq, Eq)]
pub enum NetEvent {
    Connected,
    Data(Vec<u8>),
    Disconnected,
}

/// UDP discovery socket backed by [`EcnSocket`].
pub struct UdpDiscovery {
    socket: EcnSocket,
}

impl DiscoverySocket for UdpDiscovery {
    fn broadcast(&mut self, payload: &[u8], port: u16) -> io::Result<()> {
        self.socket.broadcast(payload, port).map(|_| ())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }
}

struct Outgoing {
    due: Instant,
    frame: Vec<u8>,
    written: usize,
}

enum Link {
    Down,
    Connecting { stream: TcpStream, deadline: Instant },
    Up(TcpStream),
}

/// TCP control channel with a due-time send queue.
///
/// Nothing here blocks: `connect` only starts the handshake and
/// [`StdNetwork::poll`] reports its outcome.
pub struct StdNetwork {
    link: Link,
    outgoing: Vec<Outgoing>,
    events: Vec<NetEvent>,
}

impl Default for StdNetwork {
    fn default() -> Self {
        Self {
            link: Link::Down,
            outgoing: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl StdNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Up(_))
    }

    /// Finish a pending connect, read whatever the receiver sent and write
    /// frames that are due.
    pub fn poll(&mut self, now: Instant) -> Vec<NetEvent> {
        self.check_connect(now);
        self.read_available();
        self.flush_due(now);
        std::mem::take(&mut self.events)
    }

    fn check_connect(&mut self, now: Instant) {
        let Link::Connecting { stream, deadline } = &self.link else {
            return;
        };

        let failure = match stream.take_error() {
            Ok(Some(e)) | Err(e) => Some(e),
            Ok(None) => match stream.peer_addr() {
                Ok(addr) => {
                    debug!(%addr, "Control channel connected");
                    None
                }
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                    if now < *deadline {
                        return;
                    }
                    Some(io::Error::from(io::ErrorKind::TimedOut))
                }
                Err(e) => Some(e),
            },
        };

        if let Some(e) = failure {
            warn!(error = %e, "Connect failed");
            self.drop_connection();
            return;
        }

        if let Link::Connecting { stream, .. } = std::mem::replace(&mut self.link, Link::Down) {
            self.link = Link::Up(stream);
            self.events.push(NetEvent::Connected);
        }
    }

    fn read_available(&mut self) {
        let Link::Up(stream) = &mut self.link else {
            return;
        };

        let mut buf = [0u8; READ_BUFFER_LEN];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => {
                    debug!("Receiver closed the control channel");
                    self.drop_connection();
                    return;
                }
                Ok(len) => self.events.push(NetEvent::Data(buf[..len].to_vec())),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Control channel read failed");
                    self.drop_connection();
                    return;
                }
            }
        }
    }

    fn flush_due(&mut self, now: Instant) {
        let Link::Up(stream) = &mut self.link else {
            return;
        };

        while let Some(index) = self.outgoing.iter().position(|o| o.due <= now) {
            let outgoing = &mut self.outgoing[index];
            match stream.write(&outgoing.frame[outgoing.written..]) {
                Ok(0) => {
                    warn!("Control channel accepted no bytes");
                    self.drop_connection();
                    return;
                }
                Ok(len) => {
                    outgoing.written += len;
                    if outgoing.written == outgoing.frame.len() {
                        self.outgoing.remove(index);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Control channel write failed");
                    self.drop_connection();
                    return;
                }
            }
        }
    }

    fn drop_connection(&mut self) {
        self.link = Link::Down;
        self.outgoing.clear();
        self.events.push(NetEvent::Disconnected);
    }
}

/// Whether a non-blocking connect returned because it is still under way.
fn connect_in_progress(error: &io::Error) -> bool {
    #[cfg(unix)]
    if error.raw_os_error() == Some(libc::EINPROGRESS) {
        return true;
    }
    error.kind() == io::ErrorKind::WouldBlock
}

impl Network for StdNetwork {
    type Discovery = UdpDiscovery;

    fn bind_discovery(&mut self, port: u16, recv_timeout: Duration) -> io::Result<Self::Discovery> {
        let socket = EcnSocket::bind(port, recv_timeout).map_err(|e| match e {
            DiscoveryError::NetworkError(message) => io::Error::new(io::ErrorKind::AddrInUse, message),
            other => io::Error::other(other),
        })?;
        Ok(UdpDiscovery { socket })
    }

    fn connect(&mut self, addr: SocketAddr) -> io::Result<()> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;
        socket.set_nodelay(true)?;

        match socket.connect(&SockAddr::from(addr)) {
            Ok(()) => {}
            Err(e) if connect_in_progress(&e) => {}
            Err(e) => return Err(e),
        }

        debug!(%addr, "Control channel connecting");
        self.outgoing.clear();
        self.link = Link::Connecting {
            stream: socket.into(),
            deadline: Instant::now() + CONNECT_TIMEOUT,
        };
        Ok(())
    }

    fn send(&mut self, frame: &[u8], delay: Duration) -> io::Result<()> {
        if matches!(self.link, Link::Down) {
            return Err(io::Error::from(io::ErrorKind::NotConnected));
        }
        self.outgoing.push(Outgoing {
            due: Instant::now() + delay,
            frame: frame.to_vec(),
            written: 0,
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        if !matches!(std::mem::replace(&mut self.link, Link::Down), Link::Down) {
            debug!("Control channel closed");
        }
        self.outgoing.clear();
    }
}
