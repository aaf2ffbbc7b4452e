//! Translation between host commands, ISCP messages and zone events.
//!
//! Outbound, a host command on a device becomes one ISCP message. Inbound,
//! a recognized ISCP message becomes a [`ZoneEvent`]; the session decides
//! what to write to the host.

use onkyo_descriptor::{code_from_learned_label, CapabilityModel, ZoneId};
use tracing::{debug, trace};

use crate::devices::DeviceRole;
use crate::error::{EngineError, Result};
use crate::host::{HostCommand, SelectorOptions};
use crate::messages::{self, zone_codes, IscpMessage, MessageKind, NOT_AVAILABLE};

const ON: &str = "01";
const OFF: &str = "00";

/// Scale a 0-100 level to the receiver's volume range, as two lowercase
/// hex digits.
///
/// ```
/// use onkyo_engine::encode_volume;
///
/// assert_eq!(encode_volume(100, 80), "50");
/// assert_eq!(encode_volume(50, 80), "28");
/// ```
pub fn encode_volume(level: u8, max_volume: u8) -> String {
    let level = u32::from(level.min(100));
    let steps = (level * u32::from(max_volume) + 50) / 100;
    format!("{:02x}", steps)
}

/// Scale a receiver volume payload to 0-100. `None` means unknown.
///
/// ```
/// use onkyo_engine::decode_volume;
///
/// assert_eq!(decode_volume("50", 80), Some(100));
/// assert_eq!(decode_volume("N/A", 80), None);
/// ```
pub fn decode_volume(payload: &str, max_volume: u8) -> Option<u8> {
    let payload = payload.trim();
    if payload == NOT_AVAILABLE || max_volume == 0 {
        return None;
    }
    let steps = u32::from_str_radix(payload, 16).ok()?;
    let max = u32::from(max_volume);
    let percent = (steps * 100 + max / 2) / max;
    Some(percent.min(100) as u8)
}

/// A state change reported by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneEvent {
    Power { zone: ZoneId, on: bool },
    Muted { zone: ZoneId, muted: bool },
    Volume { zone: ZoneId, percent: u8 },
    Source { zone: ZoneId, name: String },
    /// `learned` is set when the code was unknown and has just been added
    ListeningMode { label: String, learned: bool },
    TunerPreset { label: String },
}

/// Build the ISCP message for a host command.
///
/// `options` are the selector's current host-side options; they resolve a
/// selector level to an option name. Returns `Ok(None)` for the hidden
/// "Off" level, which sends nothing.
pub fn outbound(
    model: &CapabilityModel,
    role: DeviceRole,
    command: HostCommand,
    options: Option<&SelectorOptions>,
) -> Result<Option<String>> {
    let zone = model
        .enabled_zone(role.zone())
        .ok_or(EngineError::ZoneUnavailable(role.zone()))?;
    let codes = zone_codes(zone.id);

    let message = match (role, command) {
        (DeviceRole::Power(_), HostCommand::On) => messages::command(codes.power, ON),
        (DeviceRole::Power(_), HostCommand::Off) => messages::command(codes.power, OFF),

        (DeviceRole::Volume(_), HostCommand::SetLevel(level)) => {
            let level = level.min(100) as u8;
            messages::command(codes.volume, &encode_volume(level, zone.max_volume))
        }
        // Mute has the opposite sense of power: "On" means audible
        (DeviceRole::Volume(_), HostCommand::On) => messages::command(codes.mute, OFF),
        (DeviceRole::Volume(_), HostCommand::Off) => messages::command(codes.mute, ON),

        (DeviceRole::Source(_), HostCommand::SetLevel(level)) => {
            let Some(name) = option_at(options, level)? else {
                return Ok(None);
            };
            let selector = model
                .selector_by_name(name)
                .ok_or_else(|| EngineError::UnknownSelector(name.to_string()))?;
            messages::command(codes.source, &selector.id)
        }

        (DeviceRole::ListeningMode, HostCommand::SetLevel(level)) => {
            let Some(label) = option_at(options, level)? else {
                return Ok(None);
            };
            let code = match model.listening_mode_by_label(label) {
                Some(mode) => mode.code.clone(),
                None => code_from_learned_label(label)
                    .map(str::to_uppercase)
                    .ok_or_else(|| EngineError::UnknownListeningMode(label.to_string()))?,
            };
            messages::command(messages::LISTENING_MODE, &code)
        }

        (DeviceRole::TunerPreset, HostCommand::SetLevel(level)) => {
            let Some(label) = option_at(options, level)? else {
                return Ok(None);
            };
            let number = preset_number(label)
                .ok_or_else(|| EngineError::InvalidPresetLabel(label.to_string()))?;
            messages::command(messages::TUNER_PRESET, &format!("{:02X}", number))
        }

        (role, command) => {
            return Err(EngineError::UnsupportedCommand {
                unit: role.unit(),
                command: format!("{:?}", command),
            })
        }
    };

    debug!(unit = role.unit(), message = %message, "Translated host command");
    Ok(Some(message))
}

fn option_at(options: Option<&SelectorOptions>, level: u32) -> Result<Option<&str>> {
    if level < 10 {
        return Ok(None);
    }
    options
        .and_then(|o| o.name_at_level(level))
        .map(Some)
        .ok_or(EngineError::UnknownOption(level))
}

fn preset_number(label: &str) -> Option<u8> {
    let number = label.trim_start().split(' ').next()?;
    number.parse().ok()
}

/// Interpret an inbound message against the model.
///
/// Unknown codes, unknown ids and unusable payloads yield `None`. An
/// unknown listening-mode code is learned into the model first, so every
/// observed mode resolves to a label.
pub fn inbound(model: &mut CapabilityModel, message: &IscpMessage<'_>) -> Option<ZoneEvent> {
    let Some(kind) = message.kind() else {
        trace!(code = message.code, "Ignoring unrecognized message code");
        return None;
    };
    let payload = message.payload.trim();

    match kind {
        MessageKind::Power(zone) => {
            enabled(model, zone)?;
            switch_state(payload).map(|on| ZoneEvent::Power { zone, on })
        }
        MessageKind::Mute(zone) => {
            enabled(model, zone)?;
            switch_state(payload).map(|muted| ZoneEvent::Muted { zone, muted })
        }
        MessageKind::Volume(zone) => {
            let max_volume = enabled(model, zone)?;
            decode_volume(payload, max_volume).map(|percent| ZoneEvent::Volume { zone, percent })
        }
        MessageKind::Source(zone) => {
            enabled(model, zone)?;
            match model.selector_by_id(payload) {
                Some(selector) => Some(ZoneEvent::Source {
                    zone,
                    name: selector.name.clone(),
                }),
                None => {
                    debug!(zone = %zone, id = payload, "Source id not in descriptor");
                    None
                }
            }
        }
        MessageKind::TunerPreset => model
            .preset_by_code(payload)
            .map(|preset| ZoneEvent::TunerPreset {
                label: preset.label.clone(),
            }),
        MessageKind::ListeningMode => {
            if payload.is_empty() || payload == NOT_AVAILABLE {
                return None;
            }
            let learned = model.learn_listening_mode(payload);
            model
                .listening_mode_by_code(payload)
                .map(|mode| ZoneEvent::ListeningMode {
                    label: mode.label.clone(),
                    learned,
                })
        }
        MessageKind::ReceiverInfo => None,
    }
}

fn enabled(model: &CapabilityModel, zone: ZoneId) -> Option<u8> {
    model.enabled_zone(zone).map(|z| z.max_volume)
}

fn switch_state(payload: &str) -> Option<bool> {
    match payload {
        ON => Some(true),
        OFF => Some(false),
        _ => None,
    }
}
