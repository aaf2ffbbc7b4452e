//! Host devices derived from a capability model.
//!
//! Each enabled zone gets a power switch, a volume dimmer and a source
//! selector; the main zone also gets listening-mode and tuner-preset
//! selectors. Devices live at fixed unit ids:
//!
//! | Zone   | Power | Source | Volume | Mode | Tuner |
//! |--------|-------|--------|--------|------|-------|
//! | Main   | 1     | 2      | 3      | 4    | 5     |
//! | Zone 2 | 6     | 7      | 8      |      |       |
//! | Zone 3 | 9     | 10     | 11     |      |       |
//! | Zone 4 | 12    | 13     | 14     |      |       |

use onkyo_descriptor::{CapabilityModel, Zone, ZoneId};

use crate::host::{DeviceKind, DeviceSpec, SelectorOptions, SelectorStyle, UnitId};

/// The function a host device serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    Power(ZoneId),
    Source(ZoneId),
    /// Level sets volume; on/off unmutes/mutes
    Volume(ZoneId),
    ListeningMode,
    TunerPreset,
}

impl DeviceRole {
    pub fn unit(self) -> UnitId {
        match self {
            DeviceRole::ListeningMode => 4,
            DeviceRole::TunerPreset => 5,
            DeviceRole::Power(zone) => zone_base(zone),
            DeviceRole::Source(zone) => zone_base(zone) + 1,
            DeviceRole::Volume(zone) => zone_base(zone) + 2,
        }
    }

    pub fn from_unit(unit: UnitId) -> Option<Self> {
        match unit {
            1 => Some(DeviceRole::Power(ZoneId::Main)),
            2 => Some(DeviceRole::Source(ZoneId::Main)),
            3 => Some(DeviceRole::Volume(ZoneId::Main)),
            4 => Some(DeviceRole::ListeningMode),
            5 => Some(DeviceRole::TunerPreset),
            6..=14 => {
                let zone = ZoneId::from_number((unit - 6) / 3 + 2)?;
                match (unit - 6) % 3 {
                    0 => Some(DeviceRole::Power(zone)),
                    1 => Some(DeviceRole::Source(zone)),
                    _ => Some(DeviceRole::Volume(zone)),
                }
            }
            _ => None,
        }
    }

    pub fn zone(self) -> ZoneId {
        match self {
            DeviceRole::Power(zone) | DeviceRole::Source(zone) | DeviceRole::Volume(zone) => zone,
            DeviceRole::ListeningMode | DeviceRole::TunerPreset => ZoneId::Main,
        }
    }

    pub fn kind(self) -> DeviceKind {
        match self {
            DeviceRole::Power(_) => DeviceKind::Switch,
            DeviceRole::Volume(_) => DeviceKind::Dimmer,
            DeviceRole::Source(_) | DeviceRole::ListeningMode | DeviceRole::TunerPreset => {
                DeviceKind::Selector
            }
        }
    }

    /// Roles created for `zone`, in creation order.
    pub fn for_zone(zone: ZoneId) -> Vec<DeviceRole> {
        let mut roles = vec![
            DeviceRole::Power(zone),
            DeviceRole::Source(zone),
            DeviceRole::Volume(zone),
        ];
        if zone.is_main() {
            roles.push(DeviceRole::ListeningMode);
            roles.push(DeviceRole::TunerPreset);
        }
        roles
    }
}

fn zone_base(zone: ZoneId) -> UnitId {
    match zone {
        ZoneId::Main => 1,
        other => 6 + (other.number() - 2) * 3,
    }
}

/// Selector options projected from the model, or `None` for non-selectors.
pub fn project_options(model: &CapabilityModel, role: DeviceRole) -> Option<SelectorOptions> {
    match role {
        DeviceRole::Source(_) => Some(SelectorOptions::new(
            model.selector_names(),
            SelectorStyle::DropDown,
        )),
        DeviceRole::ListeningMode => Some(SelectorOptions::new(
            model.listening_mode_labels(),
            SelectorStyle::Buttons,
        )),
        DeviceRole::TunerPreset => Some(SelectorOptions::new(
            model.preset_labels(),
            SelectorStyle::DropDown,
        )),
        DeviceRole::Power(_) | DeviceRole::Volume(_) => None,
    }
}

/// Host device description for `role` in `zone`.
pub fn device_spec(model: &CapabilityModel, model_name: &str, zone: &Zone, role: DeviceRole) -> DeviceSpec {
    let name = match role {
        DeviceRole::Power(_) => format!("{} {} Power", model_name, zone.name),
        DeviceRole::Source(_) => format!("{} {} Source", model_name, zone.name),
        DeviceRole::Volume(_) => format!("{} {} Volume", model_name, zone.name),
        DeviceRole::ListeningMode => format!("{} {} Mode", model_name, zone.name),
        DeviceRole::TunerPreset => format!("{} Tuner", model_name),
    };

    DeviceSpec {
        unit: role.unit(),
        name,
        kind: role.kind(),
        options: project_options(model, role),
    }
}
