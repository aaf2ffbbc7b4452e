//! In-memory host platform and network that plays a receiver.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use eiscp_codec::{encode, try_decode, CodecConfig};
use onkyo_engine::{
    DeviceSpec, DeviceState, DiscoverySocket, Engine, EngineConfig, HostPlatform, Network,
    SelectorOptions, SessionState, UnitId,
};

pub const DESCRIPTOR: &str = include_str!("../fixtures/two_zone.xml");
pub const RECEIVER_ADDR: &str = "192.168.1.40:60128";
pub const ECN_RESPONSE: &str = "!1ECNTX-NR509/60128/XX/0009B0123456\u{19}";

/// A frame as a receiver sends it, with the end-of-message byte.
pub fn receiver_frame(message: &str) -> Vec<u8> {
    encode(&format!("{}\u{1a}", message)).to_vec()
}

pub fn descriptor_frame() -> Vec<u8> {
    receiver_frame(&format!("!1NRI{}", DESCRIPTOR))
}

// ----------------------------------------------------------------------
// Host
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub spec: DeviceSpec,
    pub state: DeviceState,
    pub options: Option<SelectorOptions>,
}

#[derive(Debug, Default)]
pub struct MockHost {
    pub devices: BTreeMap<UnitId, MockDevice>,
    pub heartbeat: Option<Duration>,
    pub created: Vec<UnitId>,
    pub state_writes: Vec<(UnitId, i32, String)>,
}

impl MockHost {
    pub fn device(&self, unit: UnitId) -> &MockDevice {
        &self.devices[&unit]
    }

    pub fn state_of(&self, unit: UnitId) -> (i32, String) {
        let state = &self.devices[&unit].state;
        (state.n_value, state.s_value.clone())
    }
}

impl HostPlatform for MockHost {
    fn device_exists(&self, unit: UnitId) -> bool {
        self.devices.contains_key(&unit)
    }

    fn create_device(&mut self, spec: &DeviceSpec) {
        self.created.push(spec.unit);
        self.devices.insert(
            spec.unit,
            MockDevice {
                spec: spec.clone(),
                state: DeviceState::new(0, ""),
                options: spec.options.clone(),
            },
        );
    }

    fn device_state(&self, unit: UnitId) -> Option<DeviceState> {
        self.devices.get(&unit).map(|d| d.state.clone())
    }

    fn update_device_state(&mut self, unit: UnitId, n_value: i32, s_value: &str) {
        self.state_writes.push((unit, n_value, s_value.to_string()));
        if let Some(device) = self.devices.get_mut(&unit) {
            device.state = DeviceState::new(n_value, s_value);
        }
    }

    fn read_device_options(&self, unit: UnitId) -> Option<SelectorOptions> {
        self.devices.get(&unit)?.options.clone()
    }

    fn update_device_options(&mut self, unit: UnitId, options: &SelectorOptions) {
        if let Some(device) = self.devices.get_mut(&unit) {
            device.options = Some(options.clone());
        }
    }

    fn set_heartbeat(&mut self, interval: Duration) {
        self.heartbeat = Some(interval);
    }
}

// ----------------------------------------------------------------------
// Network
// ----------------------------------------------------------------------

#[derive(Debug)]
struct Air {
    pending: VecDeque<(Vec<u8>, SocketAddr)>,
    broadcasts: usize,
    receiver_online: bool,
}

/// Discovery socket sharing the simulated broadcast domain.
pub struct MockDiscoverySocket {
    air: Rc<RefCell<Air>>,
    local: SocketAddr,
}

impl DiscoverySocket for MockDiscoverySocket {
    fn broadcast(&mut self, payload: &[u8], _port: u16) -> io::Result<()> {
        let mut air = self.air.borrow_mut();
        air.broadcasts += 1;
        // Our own broadcast comes back on the shared port
        air.pending.push_back((payload.to_vec(), self.local));

        let query = try_decode(payload, &CodecConfig::default()).frame;
        if air.receiver_online && query.map(|f| f.message).as_deref() == Some("!xECNQSTN") {
            let source = RECEIVER_ADDR.parse().map_err(io::Error::other)?;
            air.pending.push_back((encode(ECN_RESPONSE).to_vec(), source));
        }
        Ok(())
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let Some((datagram, source)) = self.air.borrow_mut().pending.pop_front() else {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        };
        let len = datagram.len().min(buf.len());
        buf[..len].copy_from_slice(&datagram[..len]);
        Ok((len, source))
    }
}

pub struct MockNetwork {
    air: Rc<RefCell<Air>>,
    pub binds: usize,
    pub connects: Vec<SocketAddr>,
    /// Decoded ISCP messages with their requested delay
    pub sent: Vec<(String, Duration)>,
    pub disconnects: usize,
    pub fail_send: bool,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            air: Rc::new(RefCell::new(Air {
                pending: VecDeque::new(),
                broadcasts: 0,
                receiver_online: true,
            })),
            binds: 0,
            connects: Vec::new(),
            sent: Vec::new(),
            disconnects: 0,
            fail_send: false,
        }
    }

    pub fn set_receiver_online(&mut self, online: bool) {
        self.air.borrow_mut().receiver_online = online;
    }

    pub fn broadcasts(&self) -> usize {
        self.air.borrow().broadcasts
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn take_sent(&mut self) -> Vec<String> {
        self.sent.drain(..).map(|(m, _)| m).collect()
    }
}

impl Network for MockNetwork {
    type Discovery = MockDiscoverySocket;

    fn bind_discovery(&mut self, port: u16, _recv_timeout: Duration) -> io::Result<Self::Discovery> {
        self.binds += 1;
        Ok(MockDiscoverySocket {
            air: Rc::clone(&self.air),
            local: SocketAddr::from(([192, 168, 1, 10], port)),
        })
    }

    fn connect(&mut self, addr: SocketAddr) -> io::Result<()> {
        self.connects.push(addr);
        Ok(())
    }

    fn send(&mut self, frame: &[u8], delay: Duration) -> io::Result<()> {
        if self.fail_send {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let decoded = try_decode(frame, &CodecConfig::default());
        let message = decoded
            .frame
            .map(|f| f.message)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "not a frame"))?;
        self.sent.push((message, delay));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }
}

// ----------------------------------------------------------------------
// Engine drivers
// ----------------------------------------------------------------------

pub type TestEngine = Engine<MockHost, MockNetwork>;

pub fn new_engine() -> TestEngine {
    let mut engine = Engine::new(EngineConfig::default(), MockHost::default(), MockNetwork::new())
        .expect("default config is valid");
    engine.on_start();
    engine
}

/// Tick until `state` is reached, answering the handshake like a receiver.
/// Returns the number of ticks taken.
pub fn drive_until(engine: &mut TestEngine, state: SessionState, max_ticks: usize) -> usize {
    for tick in 1..=max_ticks {
        engine.on_tick();
        respond(engine);
        if engine.state() == state {
            return tick;
        }
    }
    panic!("engine stuck at {} after {} ticks", engine.state(), max_ticks);
}

/// React to what the engine just did, the way a receiver would.
pub fn respond(engine: &mut TestEngine) {
    match engine.state() {
        SessionState::Connecting => engine.on_connected(),
        SessionState::ConfigRequested => {
            let asked = engine
                .network()
                .sent_messages()
                .iter()
                .any(|m| m == "!1NRIQSTN");
            if asked {
                engine.network_mut().take_sent();
                engine.on_message(&descriptor_frame());
            }
        }
        _ => {}
    }
}

pub fn ready_engine() -> TestEngine {
    let mut engine = new_engine();
    drive_until(&mut engine, SessionState::Ready, 10);
    engine.network_mut().take_sent();
    engine
}
