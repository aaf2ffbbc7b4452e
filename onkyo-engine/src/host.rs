//! Host automation platform seam
//!
//! The engine mirrors receiver state into a host-side device registry and
//! accepts commands from it. Everything the engine needs from the host goes
//! through [`HostPlatform`].

use std::collections::BTreeMap;
use std::time::Duration;

/// Host-side device address
pub type UnitId = u8;

/// Widget type of a host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// On/off switch
    Switch,
    /// Switch with a 0-100 level
    Dimmer,
    /// Switch choosing one of several named levels
    Selector,
}

/// How a selector's options are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorStyle {
    Buttons,
    DropDown,
}

impl SelectorStyle {
    fn as_host_value(self) -> &'static str {
        match self {
            SelectorStyle::Buttons => "0",
            SelectorStyle::DropDown => "1",
        }
    }
}

/// Everything needed to create a host device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub unit: UnitId,
    pub name: String,
    pub kind: DeviceKind,
    pub options: Option<SelectorOptions>,
}

/// A host device's numeric and text state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub n_value: i32,
    pub s_value: String,
}

impl DeviceState {
    pub fn new(n_value: i32, s_value: impl Into<String>) -> Self {
        Self {
            n_value,
            s_value: s_value.into(),
        }
    }
}

/// Options of a selector device.
///
/// Level 0 is a hidden "Off" entry; the option at position `i` (from 1)
/// sits at level `i * 10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOptions {
    names: Vec<String>,
    style: SelectorStyle,
}

const OFF_LEVEL_NAME: &str = "Off";
const LEVEL_STEP: u32 = 10;

const LEVEL_NAMES: &str = "LevelNames";
const LEVEL_ACTIONS: &str = "LevelActions";
const LEVEL_OFF_HIDDEN: &str = "LevelOffHidden";
const SELECTOR_STYLE: &str = "SelectorStyle";
const DELIMITER: char = '|';

impl SelectorOptions {
    pub fn new(names: Vec<String>, style: SelectorStyle) -> Self {
        Self { names, style }
    }

    /// Option names, excluding the hidden "Off" level.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn style(&self) -> SelectorStyle {
        self.style
    }

    /// Name of the option at `level`; `None` for "Off" and unknown levels.
    pub fn name_at_level(&self, level: u32) -> Option<&str> {
        let index = (level / LEVEL_STEP) as usize;
        if index == 0 {
            return None;
        }
        self.names.get(index - 1).map(String::as_str)
    }

    /// Level of the option called `name`.
    pub fn level_of(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| (i as u32 + 1) * LEVEL_STEP)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Append an option, returning `false` if it is already present.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Flatten into the host's string map (`LevelNames`, `LevelActions`,
    /// `LevelOffHidden`, `SelectorStyle`).
    pub fn to_host_map(&self) -> BTreeMap<String, String> {
        let mut level_names = String::from(OFF_LEVEL_NAME);
        for name in &self.names {
            level_names.push(DELIMITER);
            level_names.push_str(name);
        }

        let mut map = BTreeMap::new();
        map.insert(LEVEL_NAMES.to_string(), level_names);
        map.insert(
            LEVEL_ACTIONS.to_string(),
            DELIMITER.to_string().repeat(self.names.len()),
        );
        map.insert(LEVEL_OFF_HIDDEN.to_string(), "true".to_string());
        map.insert(
            SELECTOR_STYLE.to_string(),
            self.style.as_host_value().to_string(),
        );
        map
    }

    /// Rebuild from the host's string map. `None` without `LevelNames`.
    pub fn from_host_map(map: &BTreeMap<String, String>) -> Option<Self> {
        let level_names = map.get(LEVEL_NAMES)?;
        let names = level_names
            .split(DELIMITER)
            .skip(1)
            .map(str::to_string)
            .collect();
        let style = match map.get(SELECTOR_STYLE).map(String::as_str) {
            Some("0") => SelectorStyle::Buttons,
            _ => SelectorStyle::DropDown,
        };
        Some(Self { names, style })
    }
}

/// A command issued by the host for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    On,
    Off,
    SetLevel(u32),
}

impl HostCommand {
    /// Interpret the host's command word and level.
    pub fn parse(command: &str, level: u32) -> Option<Self> {
        match command.trim() {
            "On" => Some(HostCommand::On),
            "Off" => Some(HostCommand::Off),
            "Set Level" => Some(HostCommand::SetLevel(level)),
            _ => None,
        }
    }
}

/// Services the engine consumes from the host platform.
pub trait HostPlatform {
    fn device_exists(&self, unit: UnitId) -> bool;

    fn create_device(&mut self, spec: &DeviceSpec);

    /// Current state, or `None` if the device does not exist.
    fn device_state(&self, unit: UnitId) -> Option<DeviceState>;

    fn update_device_state(&mut self, unit: UnitId, n_value: i32, s_value: &str);

    /// Stored selector options, or `None` for non-selectors and missing devices.
    fn read_device_options(&self, unit: UnitId) -> Option<SelectorOptions>;

    /// Replace a selector's options, keeping its current state.
    fn update_device_options(&mut self, unit: UnitId, options: &SelectorOptions);

    /// Ask the host to call `on_tick` every `interval`.
    fn set_heartbeat(&mut self, interval: Duration);
}
