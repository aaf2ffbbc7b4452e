//! Session lifecycle
//!
//! [`Engine`] owns all state of one receiver session and exposes the host's
//! lifecycle callbacks as methods. Progress happens on ticks:
//!
//! ```text
//! Idle → DiscoverySocketOpen → DiscoveryRequestSent → DiscoverySucceeded
//!      → Connecting → Connected → ConfigRequested → ConfigReceived
//!      → DevicesReconciled → InitialStateRequested → Ready
//! ```
//!
//! A disconnect at any point drops the receiver identity and capability
//! model and starts over from `Idle`.

use std::fmt;
use std::time::Duration;

use eiscp_codec::{encode, Frame, FrameDecoder};
use onkyo_descriptor::{extract_document, CapabilityModel, ZoneId};
use onkyo_discovery::{discovery_request, is_drained, parse_response, ReceiverIdentity};
use tracing::{debug, error, info, trace, warn};

use crate::config::EngineConfig;
use crate::devices::{device_spec, project_options, DeviceRole};
use crate::error::{EngineError, Result};
use crate::host::{HostCommand, HostPlatform, SelectorOptions, UnitId};
use crate::messages::{self, zone_codes, IscpMessage, MessageKind};
use crate::state::{
    ActiveListeningMode, ActiveSelector, ActiveTunerPreset, Muted, Power, VolumePercent, ZoneState,
};
use crate::transport::{DiscoverySocket, Network};
use crate::translator::{self, ZoneEvent};

const DATAGRAM_BUFFER_LEN: usize = 1024;

/// Lifecycle position of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    Idle,
    DiscoverySocketOpen,
    DiscoveryRequestSent,
    DiscoverySucceeded,
    Connecting,
    Connected,
    ConfigRequested,
    ConfigReceived,
    DevicesReconciled,
    InitialStateRequested,
    Ready,
}

impl SessionState {
    /// The state that follows this one on success.
    pub fn next(self) -> Option<SessionState> {
        use SessionState::*;
        match self {
            Idle => Some(DiscoverySocketOpen),
            DiscoverySocketOpen => Some(DiscoveryRequestSent),
            DiscoveryRequestSent => Some(DiscoverySucceeded),
            DiscoverySucceeded => Some(Connecting),
            Connecting => Some(Connected),
            Connected => Some(ConfigRequested),
            ConfigRequested => Some(ConfigReceived),
            ConfigReceived => Some(DevicesReconciled),
            DevicesReconciled => Some(InitialStateRequested),
            InitialStateRequested => Some(Ready),
            Ready => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal transition.
    ///
    /// Besides stepping forward, any state may reset to `Idle`, and an
    /// unanswered discovery request falls back to resend it.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        to == SessionState::Idle
            || self.next() == Some(to)
            || (self == SessionState::DiscoveryRequestSent
                && to == SessionState::DiscoverySocketOpen)
    }

    pub fn is_ready(self) -> bool {
        self == SessionState::Ready
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The protocol engine for a single receiver.
pub struct Engine<H, N>
where
    H: HostPlatform,
    N: Network,
{
    config: EngineConfig,
    host: H,
    network: N,
    state: SessionState,
    discovery: Option<N::Discovery>,
    receiver: Option<ReceiverIdentity>,
    model: Option<CapabilityModel>,
    decoder: FrameDecoder,
    zones: ZoneState,
}

impl<H, N> Engine<H, N>
where
    H: HostPlatform,
    N: Network,
{
    /// Create an engine in the `Idle` state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` fails validation.
    pub fn new(config: EngineConfig, host: H, network: N) -> Result<Self> {
        config.validate()?;
        let decoder = FrameDecoder::with_config(config.codec_config());

        Ok(Self {
            config,
            host,
            network,
            state: SessionState::Idle,
            discovery: None,
            receiver: None,
            model: None,
            decoder,
            zones: ZoneState::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// The discovered receiver, once discovery succeeded.
    pub fn receiver(&self) -> Option<&ReceiverIdentity> {
        self.receiver.as_ref()
    }

    /// The capability model, once the descriptor has been received.
    pub fn model(&self) -> Option<&CapabilityModel> {
        self.model.as_ref()
    }

    pub fn zone_state(&self) -> &ZoneState {
        &self.zones
    }

    // ------------------------------------------------------------------
    // Lifecycle callbacks
    // ------------------------------------------------------------------

    pub fn on_start(&mut self) {
        info!("Engine starting");
        self.host.set_heartbeat(self.config.startup_tick_interval);
    }

    pub fn on_stop(&mut self) {
        info!(state = %self.state, "Engine stopping");
        self.network.disconnect();
        self.reset();
    }

    /// The control channel connected.
    pub fn on_connected(&mut self) {
        if self.state != SessionState::Connecting {
            warn!(state = %self.state, "Ignoring connect signal outside of Connecting");
            return;
        }
        self.transition(SessionState::Connected);
    }

    /// Bytes arrived on the control channel.
    ///
    /// Every complete frame is handled before returning; a trailing partial
    /// frame stays buffered for the next call.
    pub fn on_message(&mut self, data: &[u8]) {
        trace!(len = data.len(), "Received control channel data");
        self.decoder.push(data);
        while let Some(frame) = self.decoder.next_frame() {
            self.handle_frame(&frame);
        }
    }

    /// The control channel closed or failed.
    pub fn on_disconnected(&mut self) {
        warn!(state = %self.state, "Receiver disconnected, restarting discovery");
        let was_ready = self.state.is_ready();
        self.reset();
        if was_ready {
            self.host.set_heartbeat(self.config.startup_tick_interval);
        }
    }

    /// Advance the handshake as far as possible.
    ///
    /// Steps run in order within one tick, so a freshly sent discovery
    /// request is only polled on the following tick.
    pub fn on_tick(&mut self) {
        trace!(state = %self.state, "Tick");

        if self.state == SessionState::Idle {
            self.open_discovery_socket();
        }
        if self.state == SessionState::DiscoveryRequestSent {
            self.poll_discovery();
        }
        if self.state == SessionState::DiscoverySocketOpen {
            self.send_discovery_request();
        }
        if self.state == SessionState::DiscoverySucceeded {
            self.connect();
        }
        if self.state == SessionState::Connected {
            self.request_config();
        }
        if self.state == SessionState::ConfigReceived {
            self.reconcile_devices();
        }
        if self.state == SessionState::DevicesReconciled {
            self.request_initial_state();
        }
    }

    /// A host device was operated.
    ///
    /// # Errors
    ///
    /// Rejects commands before the session is ready, for unknown units and
    /// disabled zones, and for options that do not resolve to a receiver
    /// code. Send failures surface as [`EngineError::Network`].
    pub fn on_command(&mut self, unit: UnitId, command: &str, level: u32) -> Result<()> {
        debug!(unit, command, level, "Host command");

        if !self.state.is_ready() {
            return Err(EngineError::NotReady);
        }
        let role = DeviceRole::from_unit(unit).ok_or(EngineError::UnknownUnit(unit))?;
        let command =
            HostCommand::parse(command, level).ok_or_else(|| EngineError::UnsupportedCommand {
                unit,
                command: command.to_string(),
            })?;
        let model = self.model.as_ref().ok_or(EngineError::NotReady)?;

        let options = self.selector_options(role);
        let Some(message) = translator::outbound(model, role, command, options.as_ref())? else {
            return Ok(());
        };

        self.network.send(&encode(&message), Duration::ZERO)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Handshake steps
    // ------------------------------------------------------------------

    fn open_discovery_socket(&mut self) {
        match self
            .network
            .bind_discovery(self.config.discovery_port, self.config.discovery_recv_timeout)
        {
            Ok(socket) => {
                self.discovery = Some(socket);
                self.transition(SessionState::DiscoverySocketOpen);
            }
            Err(e) => error!(
                port = self.config.discovery_port,
                error = %e,
                "Cannot bind discovery socket, retrying next tick"
            ),
        }
    }

    fn send_discovery_request(&mut self) {
        let Some(socket) = self.discovery.as_mut() else {
            self.transition(SessionState::Idle);
            return;
        };

        match socket.broadcast(&discovery_request(), self.config.discovery_port) {
            Ok(()) => {
                debug!("Discovery request broadcast");
                self.transition(SessionState::DiscoveryRequestSent);
            }
            Err(e) => warn!(error = %e, "Discovery broadcast failed, retrying next tick"),
        }
    }

    fn poll_discovery(&mut self) {
        let Some(socket) = self.discovery.as_mut() else {
            self.transition(SessionState::Idle);
            return;
        };

        let codec = self.config.codec_config();
        let mut buf = [0u8; DATAGRAM_BUFFER_LEN];
        let mut found = None;
        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, source)) => {
                    if found.is_none() {
                        found = parse_response(&buf[..len], source.ip(), &codec);
                    }
                }
                Err(e) if is_drained(&e) => break,
                Err(e) => {
                    warn!(error = %e, "Discovery receive failed");
                    break;
                }
            }
        }

        match found {
            Some(receiver) => {
                info!(
                    model = %receiver.model,
                    address = %receiver.ip_address,
                    port = receiver.port,
                    region = %receiver.region,
                    mac = %receiver.mac_address,
                    "Receiver found"
                );
                self.discovery = None;
                self.receiver = Some(receiver);
                self.transition(SessionState::DiscoverySucceeded);
            }
            None => {
                debug!("No discovery answer yet, resending request");
                self.transition(SessionState::DiscoverySocketOpen);
            }
        }
    }

    fn connect(&mut self) {
        let Some(addr) = self.receiver.as_ref().map(ReceiverIdentity::control_addr) else {
            self.transition(SessionState::Idle);
            return;
        };

        match self.network.connect(addr) {
            Ok(()) => {
                info!(%addr, "Connecting to receiver");
                self.transition(SessionState::Connecting);
            }
            Err(e) => {
                warn!(%addr, error = %e, "Connect failed, restarting discovery");
                self.reset();
            }
        }
    }

    fn request_config(&mut self) {
        let message = messages::query(messages::RECEIVER_INFO);
        match self.network.send(&encode(&message), Duration::ZERO) {
            Ok(()) => self.transition(SessionState::ConfigRequested),
            Err(e) => warn!(error = %e, "Receiver information request failed, retrying next tick"),
        }
    }

    fn reconcile_devices(&mut self) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let model_name = model
            .info()
            .model
            .clone()
            .or_else(|| self.receiver.as_ref().map(|r| r.model.clone()))
            .unwrap_or_default();

        for zone in model.enabled_zones() {
            for role in DeviceRole::for_zone(zone.id) {
                if self.host.device_exists(role.unit()) {
                    continue;
                }
                let spec = device_spec(model, &model_name, zone, role);
                info!(unit = spec.unit, name = %spec.name, "Creating device");
                self.host.create_device(&spec);
            }
        }
        self.transition(SessionState::DevicesReconciled);
    }

    fn request_initial_state(&mut self) {
        let Some(model) = self.model.as_ref() else {
            return;
        };

        let mut queries = Vec::new();
        for zone in model.enabled_zones() {
            let codes = zone_codes(zone.id);
            queries.push(messages::query(codes.power));
            queries.push(messages::query(codes.volume));
            queries.push(messages::query(codes.source));
            if zone.id.is_main() {
                queries.push(messages::query(messages::TUNER_PRESET));
            }
        }

        for (n, query) in (1u32..).zip(&queries) {
            let delay = self.config.query_stagger * n;
            if let Err(e) = self.network.send(&encode(query), delay) {
                warn!(query = %query, error = %e, "Status query failed");
            }
        }
        debug!(count = queries.len(), "Initial status queries sent");

        self.transition(SessionState::InitialStateRequested);
        self.transition(SessionState::Ready);
        self.host.set_heartbeat(self.config.steady_tick_interval);
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    fn handle_frame(&mut self, frame: &Frame) {
        debug!(message = %frame.message, "Frame received");

        let Some(message) = IscpMessage::parse(&frame.message) else {
            trace!("Ignoring frame without an ISCP message");
            return;
        };

        if message.kind() == Some(MessageKind::ReceiverInfo) {
            self.handle_receiver_info(message.payload);
            return;
        }

        let Some(model) = self.model.as_mut() else {
            trace!(code = message.code, "No capability model yet, dropping message");
            return;
        };
        if let Some(event) = translator::inbound(model, &message) {
            self.apply(event);
        }
    }

    fn handle_receiver_info(&mut self, payload: &str) {
        if self.state != SessionState::ConfigRequested {
            debug!(state = %self.state, "Ignoring unsolicited receiver information");
            return;
        }

        let parsed = extract_document(payload).and_then(|xml| {
            CapabilityModel::from_xml_with(xml, self.config.default_max_volume)
        });
        match parsed {
            Ok(model) => {
                self.model = Some(model);
                self.transition(SessionState::ConfigReceived);
            }
            Err(e) => error!(error = %e, "Malformed receiver descriptor, waiting for another"),
        }
    }

    fn apply(&mut self, event: ZoneEvent) {
        debug!(?event, "Receiver state changed");

        match event {
            ZoneEvent::Power { zone, on } => {
                self.zones.set(&zone, Power(on));
                let (n, s) = if on { (1, "On") } else { (0, "Off") };
                self.push_state(DeviceRole::Power(zone).unit(), n, s);
            }
            ZoneEvent::Muted { zone, muted } => {
                self.zones.set(&zone, Muted(muted));
                let (n, s) = if muted { (0, "Off") } else { (1, "On") };
                self.push_state(DeviceRole::Volume(zone).unit(), n, s);
            }
            ZoneEvent::Volume { zone, percent } => {
                if self.zones.set(&zone, VolumePercent(percent)) {
                    self.push_state(DeviceRole::Volume(zone).unit(), 2, &percent.to_string());
                }
            }
            ZoneEvent::Source { zone, name } => {
                self.push_selector(DeviceRole::Source(zone), &name);
                self.zones.set(&zone, ActiveSelector(name));
            }
            ZoneEvent::ListeningMode { label, learned } => {
                if learned {
                    self.add_listening_mode_option(&label);
                }
                self.push_selector(DeviceRole::ListeningMode, &label);
                self.zones.set(&ZoneId::Main, ActiveListeningMode(label));
            }
            ZoneEvent::TunerPreset { label } => {
                self.push_selector(DeviceRole::TunerPreset, &label);
                self.zones.set(&ZoneId::Main, ActiveTunerPreset(label));
            }
        }
    }

    // ------------------------------------------------------------------
    // Host writes
    // ------------------------------------------------------------------

    /// Write a device state unless the device is missing or already shows it.
    fn push_state(&mut self, unit: UnitId, n_value: i32, s_value: &str) {
        let Some(current) = self.host.device_state(unit) else {
            trace!(unit, "Device missing, skipping update");
            return;
        };
        if current.n_value == n_value && current.s_value == s_value {
            return;
        }
        debug!(unit, n_value, s_value, "Updating device");
        self.host.update_device_state(unit, n_value, s_value);
    }

    fn push_selector(&mut self, role: DeviceRole, name: &str) {
        let level = self
            .selector_options(role)
            .and_then(|options| options.level_of(name));
        match level {
            Some(level) => self.push_state(role.unit(), 1, &level.to_string()),
            None => debug!(unit = role.unit(), name, "No selector level for option"),
        }
    }

    /// Host-side options, falling back to the model projection.
    fn selector_options(&self, role: DeviceRole) -> Option<SelectorOptions> {
        self.host
            .read_device_options(role.unit())
            .or_else(|| self.model.as_ref().and_then(|m| project_options(m, role)))
    }

    fn add_listening_mode_option(&mut self, label: &str) {
        let unit = DeviceRole::ListeningMode.unit();
        let Some(mut options) = self.host.read_device_options(unit) else {
            return;
        };
        if options.push(label) {
            info!(label, "Adding learned listening mode to selector");
            self.host.update_device_options(unit, &options);
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    fn transition(&mut self, to: SessionState) {
        if !self.state.can_transition_to(to) {
            error!(from = %self.state, to = %to, "Illegal session transition");
            debug_assert!(false, "illegal transition {} -> {}", self.state, to);
            return;
        }
        info!(from = %self.state, to = %to, "Session state changed");
        self.state = to;
    }

    /// Drop everything learned about the receiver and return to `Idle`.
    fn reset(&mut self) {
        self.discovery = None;
        self.receiver = None;
        self.model = None;
        self.decoder.clear();
        self.zones.clear();
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_states_are_strictly_ordered() {
        let mut state = SessionState::Idle;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            visited.push(state);
        }
        assert_eq!(visited.len(), 11);
        assert_eq!(state, SessionState::Ready);
    }

    #[rstest]
    #[case(SessionState::Idle, SessionState::DiscoverySocketOpen, true)]
    #[case(SessionState::Ready, SessionState::Idle, true)]
    #[case(SessionState::ConfigRequested, SessionState::Idle, true)]
    #[case(SessionState::DiscoveryRequestSent, SessionState::DiscoverySocketOpen, true)]
    #[case(SessionState::Idle, SessionState::Connected, false)]
    #[case(SessionState::Connected, SessionState::ConfigReceived, false)]
    #[case(SessionState::Ready, SessionState::ConfigRequested, false)]
    fn test_transition_rules(
        #[case] from: SessionState,
        #[case] to: SessionState,
        #[case] legal: bool,
    ) {
        assert_eq!(from.can_transition_to(to), legal);
    }
}
