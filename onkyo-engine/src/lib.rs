//! Onkyo/Integra eISCP session engine
//!
//! Discovers a receiver, keeps a control session with it, learns its
//! capabilities from the XML descriptor and translates in both directions
//! between host-platform devices and ISCP messages.
//!
//! The engine is single-threaded and driven entirely by its caller:
//!
//! - [`Engine::on_tick`] advances the handshake; the engine asks for a tick
//!   cadence through [`HostPlatform::set_heartbeat`].
//! - [`Engine::on_connected`], [`Engine::on_message`] and
//!   [`Engine::on_disconnected`] report transport events.
//! - [`Engine::on_command`] forwards host device commands.
//!
//! Sockets and the device registry sit behind the [`Network`] and
//! [`HostPlatform`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use onkyo_engine::{Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default(), host, network)?;
//! engine.on_start();
//! loop {
//!     // feed socket data into engine.on_message(..)
//!     engine.on_tick();
//! }
//! ```

pub mod config;
pub mod devices;
pub mod error;
pub mod host;
pub mod logging;
pub mod messages;
pub mod session;
pub mod state;
pub mod translator;
pub mod transport;

pub use config::EngineConfig;
pub use devices::DeviceRole;
pub use error::{EngineError, Result};
pub use host::{
    DeviceKind, DeviceSpec, DeviceState, HostCommand, HostPlatform, SelectorOptions, SelectorStyle,
    UnitId,
};
pub use session::{Engine, SessionState};
pub use translator::{decode_volume, encode_volume, ZoneEvent};
pub use transport::{DiscoverySocket, Network};

pub use onkyo_descriptor::{CapabilityModel, ZoneId};
pub use onkyo_discovery::ReceiverIdentity;
